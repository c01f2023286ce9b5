use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};

use crate::error::ServiceError;

/// One parsed workbook row: branch name and amount.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub branch_name: String,
    pub amount: f64,
}

/// Parse an uploaded .xlsx into rows from the named worksheet. The first
/// column is the branch name, the second the amount; a header row without
/// a numeric amount is skipped.
pub fn parse_workbook(bytes: &[u8], sheet_name: &str) -> Result<Vec<SheetRow>, ServiceError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ServiceError::Validation(format!("not a valid xlsx workbook: {e}")))?;

    // The "is null" wording is what the upload error refinement on the
    // client keys on.
    let range = workbook.worksheet_range(sheet_name).map_err(|_| {
        ServiceError::Internal(format!(
            "cannot read workbook because sheet \"{sheet_name}\" is null"
        ))
    })?;

    let mut rows = Vec::new();
    for (index, row) in range.rows().enumerate() {
        let branch_name = match row.first() {
            Some(Data::String(s)) if !s.trim().is_empty() => s.trim().to_uppercase(),
            Some(Data::Empty) | None => continue,
            Some(other) => other.to_string().trim().to_uppercase(),
        };
        let amount = match row.get(1) {
            Some(Data::Float(f)) => *f,
            Some(Data::Int(i)) => *i as f64,
            Some(Data::String(s)) => match s.trim().parse::<f64>() {
                Ok(value) => value,
                // Header row.
                Err(_) if index == 0 => continue,
                Err(_) => {
                    return Err(ServiceError::Validation(format!(
                        "row {}: \"{}\" is not a number",
                        index + 1,
                        s.trim()
                    )))
                }
            },
            _ => {
                return Err(ServiceError::Validation(format!(
                    "row {}: missing amount for {branch_name}",
                    index + 1
                )))
            }
        };
        if amount < 0.0 {
            return Err(ServiceError::Validation(format!(
                "row {}: amount must not be negative",
                index + 1
            )));
        }
        rows.push(SheetRow {
            branch_name,
            amount,
        });
    }

    if rows.is_empty() {
        return Err(ServiceError::Validation(format!(
            "sheet \"{sheet_name}\" contains no data rows"
        )));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_a_validation_error() {
        let result = parse_workbook(b"not an xlsx", "targets");
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn missing_sheet_message_names_the_sheet_as_null() {
        // A minimal empty zip is a structurally valid xlsx container for
        // calamine to open, but carries no sheets.
        let empty_zip: &[u8] = &[
            0x50, 0x4b, 0x05, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        match parse_workbook(empty_zip, "collections") {
            Err(ServiceError::Internal(message)) => {
                assert!(message.contains("sheet \"collections\" is null"));
            }
            // Some calamine versions refuse the container outright, which
            // still surfaces as a validation error to the caller.
            Err(ServiceError::Validation(_)) => {}
            other => panic!("expected an error, got {other:?}"),
        }
    }
}
