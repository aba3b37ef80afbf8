use std::io::{self, Write};
use std::path::Path;

use masterfile_core::model::{EquipmentKey, EquipmentPattern};
use masterfile_core::parsing::values::format_number;
use masterfile_core::pipeline::BatchReport;
use masterfile_core::{AppendOutcome, SyncReport};

use crate::commands::material::ParsedMaterial;

pub fn print_materials(out: &mut impl Write, parsed: &[ParsedMaterial]) -> io::Result<()> {
    let width = parsed.iter().map(|p| p.raw.len()).max().unwrap_or(10).max(8);
    writeln!(out, "  {:<width$}  {:<12} {}", "Material", "Spec", "Grade")?;
    for p in parsed {
        writeln!(out, "  {:<width$}  {:<12} {}", p.raw, p.spec, p.grade)?;
    }
    Ok(())
}

pub fn print_pattern(
    out: &mut impl Write,
    key: &EquipmentKey,
    pattern: &EquipmentPattern,
) -> io::Result<()> {
    writeln!(out, "=== {key} ===\n")?;
    if pattern.is_empty() {
        return writeln!(out, "  (no template block)");
    }
    if let Some(first) = pattern.parts.first() {
        writeln!(out, "  Description: {}\n", first.description)?;
    }

    let width = pattern.parts.iter().map(|p| p.part.len()).max().unwrap_or(5).max(5);
    writeln!(
        out,
        "  {:<width$}  {:<8} {:<18} {:>8} {:>8}",
        "Part", "Phase", "Type", "Op.temp", "Op.press"
    )?;
    for p in &pattern.parts {
        writeln!(
            out,
            "  {:<width$}  {:<8} {:<18} {:>8} {:>8}",
            p.part,
            p.phase.as_deref().unwrap_or("-"),
            p.type_name.as_deref().unwrap_or("-"),
            format_number(p.oper_temp),
            format_number(p.oper_press),
        )?;
    }
    writeln!(
        out,
        "\n  Block operating values: {} C / {} MPa",
        format_number(pattern.template_oper_temp),
        format_number(pattern.template_oper_press)
    )
}

pub fn print_append(out: &mut impl Write, outcome: &AppendOutcome, workbook: &Path) -> io::Result<()> {
    match outcome {
        AppendOutcome::Appended {
            key,
            sequence_no,
            start_row,
            rows,
        } => writeln!(
            out,
            "Appended {key} as No. {sequence_no}: rows {start_row}-{} in {}",
            start_row + (*rows as u32).saturating_sub(1),
            workbook.display()
        ),
        AppendOutcome::Skipped { key, reason } => writeln!(out, "Skipped {key}: {reason}"),
    }
}

pub fn print_sync(out: &mut impl Write, report: &SyncReport, deck: &Path) -> io::Result<()> {
    if report.created_deck {
        writeln!(out, "Created {}", deck.display())?;
    }
    for u in &report.updated {
        let mut notes = Vec::new();
        if !u.table_filled {
            notes.push("no material table");
        }
        if u.picture_replaced {
            notes.push("picture replaced");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" ({})", notes.join(", "))
        };
        writeln!(
            out,
            "  slide {:>2}  {:<28} {} row(s){}",
            u.slide_index + 1,
            u.key.to_string(),
            u.rows,
            notes
        )?;
    }
    for s in &report.skipped {
        writeln!(
            out,
            "  slide {:>2}  {:<28} skipped: {}",
            s.slide_index + 1,
            s.key.to_string(),
            s.reason
        )?;
    }
    writeln!(
        out,
        "\n{} slide(s) updated, {} skipped",
        report.updated.len(),
        report.skipped.len()
    )
}

pub fn print_batch(out: &mut impl Write, report: &BatchReport) -> io::Result<()> {
    writeln!(out, "=== Drawings ===\n")?;
    for d in &report.drawings {
        let status = match &d.append {
            AppendOutcome::Appended {
                sequence_no,
                start_row,
                ..
            } => format!("No. {sequence_no} at row {start_row}"),
            AppendOutcome::Skipped { reason, .. } => format!("skipped: {reason}"),
        };
        writeln!(out, "  {:<36} {} BOM item(s), {}", d.drawing, d.bom_items, status)?;
        for f in &d.failed_regions {
            writeln!(out, "    region {} failed: {}", f.label, f.error)?;
        }
    }
    for f in &report.failures {
        writeln!(out, "  {:<36} FAILED: {}", f.drawing, f.error)?;
    }

    writeln!(out, "\n=== Slides ===\n")?;
    match (&report.sync, &report.sync_error) {
        (Some(sync), _) => writeln!(
            out,
            "  {} updated, {} skipped",
            sync.updated.len(),
            sync.skipped.len()
        ),
        (None, Some(error)) => writeln!(out, "  sync failed: {error}"),
        (None, None) => writeln!(out, "  nothing appended, deck untouched"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_materials_table() {
        let parsed = vec![ParsedMaterial {
            raw: "SA-516-70".into(),
            spec: "SA".into(),
            grade: "516-70".into(),
        }];
        let text = render(|out| print_materials(out, &parsed));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Material"));
        assert!(lines[1].contains("SA-516-70"));
        assert!(lines[1].trim_end().ends_with("516-70"));
    }

    #[test]
    fn test_append_row_range() {
        let outcome = AppendOutcome::Appended {
            key: EquipmentKey::new("MLK PMT 10101", "V-001"),
            sequence_no: 3,
            start_row: 12,
            rows: 2,
        };
        let text = render(|out| print_append(out, &outcome, Path::new("out.xlsx")));
        assert!(text.contains("No. 3: rows 12-13 in out.xlsx"));
    }

    #[test]
    fn test_empty_batch() {
        let text = render(|out| print_batch(out, &BatchReport::default()));
        assert!(text.contains("=== Drawings ==="));
        assert!(text.contains("nothing appended, deck untouched"));
    }
}
