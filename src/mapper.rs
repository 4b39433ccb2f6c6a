use serde::Serialize;

/// Canonical lead columns a sheet header can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    ClientName,
    ClientPhone,
    ClientPhone2,
    ClientPhone3,
    ClientEmail,
    ClientJobTitle,
    Platform,
    Stage,
}

impl LeadField {
    /// Column order for headerless bulk pastes, also the template header order.
    pub const POSITIONAL: [LeadField; 8] = [
        LeadField::ClientName,
        LeadField::ClientPhone,
        LeadField::ClientPhone2,
        LeadField::ClientPhone3,
        LeadField::ClientEmail,
        LeadField::ClientJobTitle,
        LeadField::Platform,
        LeadField::Stage,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            LeadField::ClientName => "client_name",
            LeadField::ClientPhone => "client_phone",
            LeadField::ClientPhone2 => "client_phone2",
            LeadField::ClientPhone3 => "client_phone3",
            LeadField::ClientEmail => "client_email",
            LeadField::ClientJobTitle => "client_job_title",
            LeadField::Platform => "platform",
            LeadField::Stage => "stage",
        }
    }

    /// Resolve a header by case-insensitive substring match. Rules are tried
    /// in order and the first hit wins, so `Full Name` is a name column and
    /// `Phone 2` never lands on the primary phone.
    pub fn from_header(header: &str) -> Option<LeadField> {
        let h = header.to_lowercase();
        if h.contains("name") {
            Some(LeadField::ClientName)
        } else if h.contains("phone") && !h.contains('2') && !h.contains('3') {
            Some(LeadField::ClientPhone)
        } else if h.contains("phone2") || h.contains("phone 2") {
            Some(LeadField::ClientPhone2)
        } else if h.contains("phone3") || h.contains("phone 3") {
            Some(LeadField::ClientPhone3)
        } else if h.contains("email") {
            Some(LeadField::ClientEmail)
        } else if h.contains("job") || h.contains("title") {
            Some(LeadField::ClientJobTitle)
        } else if h.contains("platform") || h.contains("source") {
            Some(LeadField::Platform)
        } else if h.contains("stage") || h.contains("status") {
            Some(LeadField::Stage)
        } else {
            None
        }
    }
}

/// Raw cell values picked out of one row, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialLead {
    pub client_name: String,
    pub client_phone: String,
    pub client_phone2: String,
    pub client_phone3: String,
    pub client_email: String,
    pub client_job_title: String,
    pub platform: String,
    pub stage: String,
}

impl PartialLead {
    fn slot(&mut self, field: LeadField) -> &mut String {
        match field {
            LeadField::ClientName => &mut self.client_name,
            LeadField::ClientPhone => &mut self.client_phone,
            LeadField::ClientPhone2 => &mut self.client_phone2,
            LeadField::ClientPhone3 => &mut self.client_phone3,
            LeadField::ClientEmail => &mut self.client_email,
            LeadField::ClientJobTitle => &mut self.client_job_title,
            LeadField::Platform => &mut self.platform,
            LeadField::Stage => &mut self.stage,
        }
    }
}

/// Which lead field each column of a sheet feeds, resolved once per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnLayout {
    columns: Vec<Option<LeadField>>,
}

impl ColumnLayout {
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        Self {
            columns: headers
                .iter()
                .map(|h| LeadField::from_header(h.as_ref()))
                .collect(),
        }
    }

    pub fn positional() -> Self {
        Self {
            columns: LeadField::POSITIONAL.iter().copied().map(Some).collect(),
        }
    }

    pub fn columns(&self) -> &[Option<LeadField>] {
        &self.columns
    }

    pub fn resolves(&self, field: LeadField) -> bool {
        self.columns.contains(&Some(field))
    }

    /// Fill a [`PartialLead`] from `cells`. Cells past the end of the row read
    /// as empty, extra cells and unmapped columns are dropped, and when two
    /// columns feed the same field the later one wins.
    pub fn map_row<S: AsRef<str>>(&self, cells: &[S]) -> PartialLead {
        let mut lead = PartialLead::default();
        for (idx, field) in self.columns.iter().enumerate() {
            let Some(field) = field else { continue };
            let value: &str = cells.get(idx).map(|c| c.as_ref()).unwrap_or("");
            *lead.slot(*field) = value.to_string();
        }
        lead
    }
}
