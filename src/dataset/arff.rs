//! Attribute-relation file format (ARFF) reader
//!
//! Parses the dense ARFF dialect produced by Weka-style tools: an
//! `@relation` line, `@attribute` declarations (numeric, nominal, string,
//! date), then `@data` rows. `?` marks a missing value. Payload bytes are
//! decoded to UTF-8 text before parsing.

use crate::error::{EffortError, Result};
use polars::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
enum AttrKind {
    Numeric,
    Text,
}

#[derive(Debug)]
struct Attribute {
    name: String,
    kind: AttrKind,
}

enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

pub fn read_arff(path: &str) -> Result<DataFrame> {
    let bytes = std::fs::read(path).map_err(|e| EffortError::Load(e.to_string()))?;
    let text = String::from_utf8_lossy(&bytes);
    parse_arff(&text)
}

fn parse_arff(text: &str) -> Result<DataFrame> {
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut in_data = false;
    let mut columns: Vec<ColumnData> = Vec::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }

        if !in_data {
            let lower = line.to_ascii_lowercase();
            if lower.starts_with("@relation") {
                continue;
            } else if lower.starts_with("@attribute") {
                attributes.push(parse_attribute(line, line_no)?);
            } else if lower.starts_with("@data") {
                if attributes.is_empty() {
                    return Err(EffortError::Load(
                        "arff: @data before any @attribute".to_string(),
                    ));
                }
                columns = attributes
                    .iter()
                    .map(|a| match a.kind {
                        AttrKind::Numeric => ColumnData::Numeric(Vec::new()),
                        AttrKind::Text => ColumnData::Text(Vec::new()),
                    })
                    .collect();
                in_data = true;
            } else {
                return Err(EffortError::Load(format!(
                    "arff: unrecognized header line {}: {}",
                    line_no + 1,
                    line
                )));
            }
            continue;
        }

        if line.starts_with('{') {
            return Err(EffortError::Load(
                "arff: sparse data rows are not supported".to_string(),
            ));
        }

        let fields = split_row(line);
        if fields.len() != attributes.len() {
            return Err(EffortError::Load(format!(
                "arff: row at line {} has {} values, expected {}",
                line_no + 1,
                fields.len(),
                attributes.len()
            )));
        }

        for (field, column) in fields.into_iter().zip(columns.iter_mut()) {
            match column {
                ColumnData::Numeric(values) => {
                    if field == "?" {
                        values.push(None);
                    } else {
                        let parsed = field.parse::<f64>().map_err(|_| {
                            EffortError::Load(format!(
                                "arff: non-numeric value {:?} at line {}",
                                field,
                                line_no + 1
                            ))
                        })?;
                        values.push(Some(parsed));
                    }
                }
                ColumnData::Text(values) => {
                    if field == "?" {
                        values.push(None);
                    } else {
                        values.push(Some(field));
                    }
                }
            }
        }
    }

    if !in_data {
        return Err(EffortError::Load("arff: missing @data section".to_string()));
    }

    let series: Vec<Column> = attributes
        .iter()
        .zip(columns)
        .map(|(attr, column)| match column {
            ColumnData::Numeric(values) => Column::new(attr.name.as_str().into(), values),
            ColumnData::Text(values) => Column::new(attr.name.as_str().into(), values),
        })
        .collect();

    DataFrame::new(series).map_err(|e| EffortError::Load(e.to_string()))
}

fn parse_attribute(line: &str, line_no: usize) -> Result<Attribute> {
    // Skip the "@attribute" keyword
    let rest = line["@attribute".len()..].trim_start();
    let (name, type_spec) = take_token(rest).ok_or_else(|| {
        EffortError::Load(format!("arff: malformed @attribute at line {}", line_no + 1))
    })?;
    let type_spec = type_spec.trim();
    if type_spec.is_empty() {
        return Err(EffortError::Load(format!(
            "arff: @attribute {:?} has no type at line {}",
            name,
            line_no + 1
        )));
    }

    let kind = if type_spec.starts_with('{') {
        AttrKind::Text
    } else {
        match type_spec
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "numeric" | "real" | "integer" => AttrKind::Numeric,
            "string" | "date" => AttrKind::Text,
            other => {
                return Err(EffortError::Load(format!(
                    "arff: unsupported attribute type {:?} at line {}",
                    other,
                    line_no + 1
                )))
            }
        }
    };

    Ok(Attribute { name, kind })
}

/// Pull one (possibly quoted) token off the front of `input`, returning it
/// with quotes stripped alongside the remainder.
fn take_token(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    let mut chars = input.char_indices();
    let (_, first) = chars.next()?;

    if first == '\'' || first == '"' {
        for (i, c) in chars {
            if c == first {
                return Some((input[1..i].to_string(), &input[i + 1..]));
            }
        }
        None
    } else {
        let end = input.find(char::is_whitespace).unwrap_or(input.len());
        Some((input[..end].to_string(), &input[end..]))
    }
}

/// Split a dense data row on commas, honoring single/double quotes.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                ',' => {
                    fields.push(current.trim().to_string());
                    current = String::new();
                }
                _ => current.push(c),
            },
        }
    }
    fields.push(current.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
% COCOMO-style toy export
@relation projects

@attribute Size numeric
@attribute 'Team' {A, B, C}
@attribute Effort real

@data
1.0, A, 10.0
2.0, B, ?
?, C, 30.0
";

    #[test]
    fn test_parse_basic() {
        let df = parse_arff(SAMPLE).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);

        let names: Vec<&str> = df.get_columns().iter().map(|c| c.name().as_str()).collect();
        assert_eq!(names, vec!["Size", "Team", "Effort"]);

        // '?' markers become nulls
        assert_eq!(df.column("Effort").unwrap().null_count(), 1);
        assert_eq!(df.column("Size").unwrap().null_count(), 1);

        let team = df.column("Team").unwrap();
        assert_eq!(team.dtype(), &DataType::String);
    }

    #[test]
    fn test_quoted_values() {
        let arff = "\
@relation q
@attribute Name string
@attribute Effort numeric
@data
'big, project', 10
plain, 20
";
        let df = parse_arff(arff).unwrap();
        assert_eq!(df.height(), 2);
        let name = df.column("Name").unwrap().str().unwrap();
        assert_eq!(name.get(0), Some("big, project"));
    }

    #[test]
    fn test_row_width_mismatch() {
        let arff = "@relation r\n@attribute A numeric\n@attribute B numeric\n@data\n1.0\n";
        assert!(matches!(parse_arff(arff), Err(EffortError::Load(_))));
    }

    #[test]
    fn test_missing_data_section() {
        let arff = "@relation r\n@attribute A numeric\n";
        assert!(matches!(parse_arff(arff), Err(EffortError::Load(_))));
    }

    #[test]
    fn test_sparse_rows_rejected() {
        let arff = "@relation r\n@attribute A numeric\n@data\n{0 1.0}\n";
        assert!(matches!(parse_arff(arff), Err(EffortError::Load(_))));
    }
}
