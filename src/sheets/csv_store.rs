use super::error::{Result, StoreError};
use super::SheetStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Workbook kept as a directory with one `<sheet>.csv` per sheet
#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    dir: PathBuf,
}

impl CsvWorkbook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sheet_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StoreError::Config(format!("Invalid sheet name: {:?}", name)));
        }
        Ok(self.dir.join(format!("{}.csv", name)))
    }
}

#[async_trait]
impl SheetStore for CsvWorkbook {
    async fn list_sheets(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn read_sheet(&self, name: &str) -> Result<Option<Vec<Vec<String>>>> {
        let path = self.sheet_path(name)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes.as_slice());

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        debug!("Read {} rows from {}", rows.len(), path.display());
        Ok(Some(rows))
    }

    async fn write_sheet(&self, name: &str, rows: &[Vec<String>]) -> Result<()> {
        let path = self.sheet_path(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
        for row in rows {
            writer.write_record(row)?;
        }
        let bytes = writer.into_inner().map_err(|e| StoreError::Io(e.into_error()))?;

        tokio::fs::write(&path, bytes).await?;
        debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("CSV workbook {}", self.dir.display())
    }
}
