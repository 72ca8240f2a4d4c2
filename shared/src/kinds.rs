/// The screens that keep rich content with inline images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Poskas,
    FinancialReport,
    Chart,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Poskas,
        RecordKind::FinancialReport,
        RecordKind::Chart,
    ];

    /// Partition key of the kind's records, also the `SK` prefix.
    pub fn key_prefix(self) -> &'static str {
        match self {
            RecordKind::Poskas => "POSKAS",
            RecordKind::FinancialReport => "FINANCIAL_REPORT",
            RecordKind::Chart => "CHART",
        }
    }

    /// Folder under the upload root.
    pub fn upload_folder(self) -> &'static str {
        match self {
            RecordKind::Poskas => "poskas",
            RecordKind::FinancialReport => "financial-reports",
            RecordKind::Chart => "charts",
        }
    }

    pub fn partition_key(self) -> String {
        self.key_prefix().to_string()
    }

    pub fn sort_key(self, record_id: &str) -> String {
        format!("{}#{}", self.key_prefix(), record_id)
    }
}
