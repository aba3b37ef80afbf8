use crate::rules::schema::{BomRule, DesignRule};

/// System message for chat-style oracles.
pub const SYSTEM_PROMPT: &str = "You are an OCR/table extraction assistant for engineering drawings.
You MUST return ONLY a single valid JSON object.
Do not include explanations, comments, markdown or any text outside the JSON.";

/// Base instruction for the design / operating data table.
pub const DESIGN_INSTRUCTION: &str = r#"The image is a DESIGN DATA (or similar) table from a pressure vessel or heat exchanger drawing.
Identify ONLY the main DESIGN / OPERATING data table and ignore any BOM / bill of materials.

You MUST return ONLY a JSON object with exactly this structure:
{
  "fluids": {
    "shell": string or null,
    "tube": string or null,
    "header": string or null
  },
  "insulation": string or null,
  "design": {
    "shell": { "temp_c": number or null, "pressure_mpa": number or null },
    "tube":  { "temp_c": number or null, "pressure_mpa": number or null }
  },
  "operating": {
    "shell": { "temp_c": number or null, "pressure_mpa": number or null },
    "tube":  { "temp_c": number or null, "pressure_mpa": number or null }
  }
}

INTERPRETATION RULES (VERY IMPORTANT):
- Tables may use labels like OPERATING, OPERATION, WORKING, or WKG:
  * Anything labelled WORKING PRESSURE / WORKING TEMPERATURE or similar = OPERATING conditions.
  * Anything labelled OPERATING PRESSURE / OPERATING TEMPERATURE = OPERATING conditions.
  * Anything labelled DESIGN PRESSURE / DESIGN TEMPERATURE = DESIGN conditions.
  * If there are TWO repeated blocks of PRESSURE/TEMPERATURE rows without clear labels,
    assume the FIRST block is OPERATING and the SECOND block is DESIGN.

- Column headings may be SHELL SIDE / TUBE SIDE / CHANNEL / TUBE BUNDLE / HEAD, etc.:
  * Map anything clearly belonging to SHELL, SHELL SIDE, SHELL PART → shell.
  * Map anything clearly belonging to TUBE, TUBE SIDE, CHANNEL, TUBE BUNDLE, HEADER → tube.
  * If only a single value is given (no split), use the same value for both shell and tube.

- Pressure units:
  * Convert kg/cm2, bar, kPa, etc. to MPa if possible.
  * If unit is not obvious but looks like e.g. "1.00 KPDG" or similar, treat it as 1.00 MPa.
  * If you cannot confidently convert, copy the numeric value and assume it is already MPa.

- Temperature units:
  * Assume °C unless clearly specified otherwise.

- FLUID / MEDIUM mapping:
  * Use rows labelled FLUID, FLUID NAME, MEDIUM OF SERVICE, or similar.
  * If there are separate columns for SHELL SIDE and TUBE SIDE, map them to fluids.shell and fluids.tube.
  * If there is only one fluid name for the whole equipment, put it into fluids.shell and fluids.tube.
  * If there is a separate HEADER/CHANNEL/TUBE BUNDLE fluid, you may put that into fluids.header.

- INSULATION mapping:
  * Look for rows labelled INSULATION, DEGREE OF INSULATION, or similar.
  * Also consider rows like FULL/SPOT/NONE RADIOGRAPHY or DEGREE OF RADIOGRAPHY if there is
    no explicit INSULATION row; in that case copy the most relevant text as insulation.
  * If the table clearly indicates NO INSULATION (NIL, NONE, NO INSULATION, '-' etc.),
    set insulation to that text (e.g. "NIL" or "NO INSULATION").

- If a value is missing / unreadable, use null.
- Do NOT add extra keys or nested structures beyond the JSON schema above.
"#;

/// Base instruction for the bill of materials table.
pub const BOM_INSTRUCTION: &str = r#"The image is a BILL OF MATERIAL (BOM) table from an engineering drawing.
Identify ONLY the main BOM table and ignore DESIGN DATA or other tables.

You MUST return ONLY a JSON object with this structure:
{
  "items": [
    { "part_label": string, "material_raw": string, "side": string or null },
    ...
  ]
}

General rules:
- Each row for a real pressure part (HEAD, SHELL, BOTTOM HEAD, CHANNEL, TUBE BUNDLE, etc.) becomes one item.
- part_label: a clean logical name such as 'Shell', 'Head', 'Bottom Head', 'Channel', or 'Tube Bundle' that can be matched against Excel part names.
- material_raw: the full material string (for example 'SA-516-70', 'SA-240 316', 'A/SA 516 Gr 70', 'FE-560-Gr912/789L', 'ZY-982-GR.212/678K').
- side: if there is shell/tube information, set side to 'shell' or 'tube'. If not clear, infer (heads/shells → 'shell', channels/tube bundles/headers → 'tube').
- Ignore bolts, nuts, gaskets and other non-primary pressure parts.
- Do NOT add extra keys.
"#;

const NOTES_HEADING: &str = "\n\nTEMPLATE-SPECIFIC NOTES FOR THIS DRAWING:\n";

/// Design instruction with the equipment's extra notes appended.
pub fn design_instruction(rule: Option<&DesignRule>) -> String {
    with_notes(DESIGN_INSTRUCTION, rule.and_then(|r| r.extra_prompt.as_deref()))
}

/// BOM instruction with the equipment's extra notes appended.
pub fn bom_instruction(rule: Option<&BomRule>) -> String {
    with_notes(BOM_INSTRUCTION, rule.and_then(|r| r.extra_prompt.as_deref()))
}

fn with_notes(base: &str, notes: Option<&str>) -> String {
    match notes {
        Some(notes) if !notes.trim().is_empty() => format!("{base}{NOTES_HEADING}{notes}"),
        _ => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EquipmentKey;
    use crate::rules::builtin_store;

    #[test]
    fn test_unknown_equipment_gets_base_instruction() {
        assert_eq!(design_instruction(None), DESIGN_INSTRUCTION);
        assert_eq!(bom_instruction(None), BOM_INSTRUCTION);
    }

    #[test]
    fn test_notes_appended_after_heading() {
        let key = EquipmentKey::new("MLK PMT 10107", "H-001");
        let text = design_instruction(builtin_store().get_design_rule(&key));
        assert!(text.starts_with(DESIGN_INSTRUCTION));
        assert!(text.contains(
            "TEMPLATE-SPECIFIC NOTES FOR THIS DRAWING:\nThis drawing is MLK PMT 10107"
        ));
    }

    #[test]
    fn test_blank_notes_ignored() {
        let rule = BomRule {
            extra_prompt: Some("  ".into()),
        };
        assert_eq!(bom_instruction(Some(&rule)), BOM_INSTRUCTION);
    }

    #[test]
    fn test_schemas_named_in_instructions() {
        assert!(DESIGN_INSTRUCTION.contains("\"pressure_mpa\""));
        assert!(BOM_INSTRUCTION.contains("\"material_raw\""));
    }
}
