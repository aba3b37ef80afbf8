use crate::ooxml::dom::{Element, Node};

/// Position and size of a shape in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeBox {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl ShapeBox {
    pub const fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        ShapeBox { x, y, cx, cy }
    }

    pub fn area(&self) -> i64 {
        self.cx * self.cy
    }

    /// Same left, top and width within `tolerance`. Height is free to differ.
    pub fn near(&self, other: &ShapeBox, tolerance: i64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.cx - other.cx).abs() <= tolerance
    }
}

/// Geometry from the shape's `xfrm`, if it has one of its own.
pub fn shape_box(shape: &Element) -> Option<ShapeBox> {
    let xfrm = shape.find("xfrm")?;
    let off = xfrm.child("off")?;
    let ext = xfrm.child("ext")?;
    let num = |el: &Element, name: &str| el.attr(name)?.parse::<i64>().ok();
    Some(ShapeBox {
        x: num(off, "x")?,
        y: num(off, "y")?,
        cx: num(ext, "cx")?,
        cy: num(ext, "cy")?,
    })
}

fn next_shape_id(tree: &Element) -> u32 {
    let mut ids = Vec::new();
    tree.find_all("cNvPr", &mut ids);
    ids.iter()
        .filter_map(|el| el.attr("id")?.parse::<u32>().ok())
        .max()
        .unwrap_or(1)
        + 1
}

/// Append a shape to the tree, ahead of any trailing `extLst`.
fn push_shape(tree: &mut Element, shape: Element) {
    let at = tree
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(e) if e.is("extLst")))
        .unwrap_or(tree.children.len());
    tree.children.insert(at, Node::Element(shape));
}

fn xfrm(b: ShapeBox) -> Element {
    Element::new("a:xfrm")
        .with_child(
            Element::new("a:off")
                .with_attr("x", b.x.to_string())
                .with_attr("y", b.y.to_string()),
        )
        .with_child(
            Element::new("a:ext")
                .with_attr("cx", b.cx.to_string())
                .with_attr("cy", b.cy.to_string()),
        )
}

fn rect_geometry() -> Element {
    Element::new("a:prstGeom")
        .with_attr("prst", "rect")
        .with_child(Element::new("a:avLst"))
}

/// Replace the paragraphs of a `txBody` with `text`: Arial 8pt, centred, anchored
/// in the middle, no wrapping. One paragraph per line; an empty text still gets a run.
pub fn set_text_body(tx_body: &mut Element, text: &str) {
    if tx_body.child("bodyPr").is_none() {
        tx_body.children.insert(0, Node::Element(Element::new("a:bodyPr")));
    }
    if let Some(body_pr) = tx_body.child_mut("bodyPr") {
        body_pr.set_attr("wrap", "none");
        body_pr.set_attr("anchor", "ctr");
    }

    tx_body.remove_children("p");
    for line in text.split('\n') {
        let paragraph = Element::new("a:p")
            .with_child(Element::new("a:pPr").with_attr("algn", "ctr"))
            .with_child(
                Element::new("a:r")
                    .with_child(
                        Element::new("a:rPr")
                            .with_attr("lang", "en-US")
                            .with_attr("sz", "800")
                            .with_attr("dirty", "0")
                            .with_child(Element::new("a:latin").with_attr("typeface", "Arial")),
                    )
                    .with_child(Element::new("a:t").with_text(line)),
            );
        tx_body.children.push(Node::Element(paragraph));
    }
}

/// Text of a `txBody`-bearing element: runs concatenated, paragraphs joined by newlines.
pub fn text_of(el: &Element) -> String {
    let Some(body) = el.child("txBody") else {
        return String::new();
    };
    body.children_named("p")
        .map(|p| {
            let mut runs = Vec::new();
            p.find_all("t", &mut runs);
            runs.iter().map(|t| t.text()).collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Set the text of the text shape at `target`, creating a text box there if none is close.
pub fn upsert_text_box(tree: &mut Element, target: ShapeBox, tolerance: i64, text: &str) {
    let existing = tree.elements_mut().find(|shape| {
        shape.is("sp") && shape_box(shape).is_some_and(|b| b.near(&target, tolerance))
    });
    if let Some(shape) = existing {
        let tx_body = shape.ensure_child("txBody", "p:txBody");
        set_text_body(tx_body, text);
        return;
    }

    let id = next_shape_id(tree);
    let mut tx_body = Element::new("p:txBody")
        .with_child(
            Element::new("a:bodyPr")
                .with_attr("wrap", "none")
                .with_child(Element::new("a:spAutoFit")),
        )
        .with_child(Element::new("a:lstStyle"));
    set_text_body(&mut tx_body, text);

    let shape = Element::new("p:sp")
        .with_child(
            Element::new("p:nvSpPr")
                .with_child(
                    Element::new("p:cNvPr")
                        .with_attr("id", id.to_string())
                        .with_attr("name", format!("TextBox {}", id - 1)),
                )
                .with_child(Element::new("p:cNvSpPr").with_attr("txBox", "1"))
                .with_child(Element::new("p:nvPr")),
        )
        .with_child(
            Element::new("p:spPr")
                .with_child(xfrm(target))
                .with_child(rect_geometry())
                .with_child(Element::new("a:noFill")),
        )
        .with_child(tx_body);
    push_shape(tree, shape);
}

/// A table inside a graphic frame, addressed by row and column.
pub struct Table<'a> {
    tbl: &'a mut Element,
}

impl<'a> Table<'a> {
    pub fn row_count(&self) -> usize {
        self.tbl.children_named("tr").count()
    }

    pub fn column_count(&self) -> usize {
        self.tbl
            .child("tblGrid")
            .map_or(0, |grid| grid.children_named("gridCol").count())
    }

    fn cell(&self, row: usize, col: usize) -> Option<&Element> {
        self.tbl.children_named("tr").nth(row)?.children_named("tc").nth(col)
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Element> {
        self.tbl
            .elements_mut()
            .filter(|e| e.is("tr"))
            .nth(row)?
            .elements_mut()
            .filter(|e| e.is("tc"))
            .nth(col)
    }

    pub fn cell_text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).map(text_of).unwrap_or_default()
    }

    pub fn set_cell_text(&mut self, row: usize, col: usize, text: &str) {
        if let Some(cell) = self.cell_mut(row, col) {
            if cell.child("txBody").is_none() {
                cell.children.insert(
                    0,
                    Node::Element(Element::new("a:txBody").with_child(Element::new("a:lstStyle"))),
                );
            }
            if let Some(tx_body) = cell.child_mut("txBody") {
                set_text_body(tx_body, text);
            }
        }
    }
}

/// Every table on the slide's top level, in shape order.
pub fn tables(tree: &mut Element) -> Vec<Table<'_>> {
    tree.elements_mut()
        .filter(|shape| shape.is("graphicFrame"))
        .filter_map(|frame| frame.find_mut("tbl"))
        .map(|tbl| Table { tbl })
        .collect()
}

/// Top-level pictures with their geometry.
pub fn pictures(tree: &Element) -> Vec<ShapeBox> {
    tree.elements()
        .filter(|shape| shape.is("pic"))
        .filter_map(shape_box)
        .collect()
}

/// Swap the main picture for the image behind relationship `r_id`.
///
/// The largest picture by area sets the geometry; it and every picture at least 80 %
/// of its area are removed. Returns false, leaving the slide alone, when there is no
/// picture.
pub fn replace_main_picture(tree: &mut Element, r_id: &str, description: &str) -> bool {
    let Some(base) = pictures(tree).into_iter().max_by_key(ShapeBox::area) else {
        return false;
    };
    let threshold = (base.area() as f64 * 0.8) as i64;

    let id = next_shape_id(tree);
    tree.children.retain(|n| match n {
        Node::Element(shape) if shape.is("pic") => {
            shape_box(shape).map_or(true, |b| b.area() < threshold)
        }
        _ => true,
    });

    let picture = Element::new("p:pic")
        .with_child(
            Element::new("p:nvPicPr")
                .with_child(
                    Element::new("p:cNvPr")
                        .with_attr("id", id.to_string())
                        .with_attr("name", format!("Picture {}", id - 1))
                        .with_attr("descr", description),
                )
                .with_child(
                    Element::new("p:cNvPicPr")
                        .with_child(Element::new("a:picLocks").with_attr("noChangeAspect", "1")),
                )
                .with_child(Element::new("p:nvPr")),
        )
        .with_child(
            Element::new("p:blipFill")
                .with_child(Element::new("a:blip").with_attr("r:embed", r_id))
                .with_child(Element::new("a:stretch").with_child(Element::new("a:fillRect"))),
        )
        .with_child(
            Element::new("p:spPr")
                .with_child(xfrm(base))
                .with_child(rect_geometry()),
        );
    push_shape(tree, picture);
    true
}
