//! Tabular export buffer
//!
//! A `Sheet` is the format-independent middle step: headers plus string
//! rows, serialized to CSV or XLSX on demand.

use rust_xlsxwriter::{Format, Workbook};

/// One exported table
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX serialization failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV buffer error: {0}")]
    Buffer(#[from] std::io::Error),
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        Ok(writer.into_inner().map_err(|e| e.into_error())?)
    }

    pub fn to_xlsx(&self) -> Result<Vec<u8>, ExportError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet().set_name(&self.name)?;

        let bold = Format::new().set_bold();
        for (col, header) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &bold)?;
        }
        for (row_idx, row) in self.rows.iter().enumerate() {
            for (col, cell) in row.iter().enumerate() {
                worksheet.write_string((row_idx + 1) as u32, col as u16, cell)?;
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sheet {
        let mut sheet = Sheet::new(
            "members",
            vec!["last_name".into(), "first_name".into(), "status".into()],
        );
        sheet.push_row(vec!["Rossi".into(), "Mario".into(), "attivo".into()]);
        sheet.push_row(vec!["Bianchi, Anna".into(), "Anna".into(), "sospeso".into()]);
        sheet
    }

    #[test]
    fn csv_quotes_embedded_commas() {
        let bytes = sample().to_csv().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("last_name,first_name,status\n"));
        assert!(text.contains("\"Bianchi, Anna\""));
    }

    #[test]
    fn xlsx_produces_a_zip_container() {
        let bytes = sample().to_xlsx().unwrap();
        // XLSX is a zip archive; check the magic bytes
        assert_eq!(&bytes[..2], b"PK");
    }
}
