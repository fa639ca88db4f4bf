//! Directive keys
//!
//! A mapping key starting with `$` is decoded once into a [`Directive`];
//! the planner then matches on it exhaustively.

/// Metadata keys popped off a declaration into its operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKey {
    Entity,
    EntityId,
    CreatePath,
    UpdatePath,
    DeletePath,
    Validate,
    SetName,
}

impl MetadataKey {
    pub const ALL: [Self; 7] = [
        Self::Entity,
        Self::EntityId,
        Self::CreatePath,
        Self::UpdatePath,
        Self::DeletePath,
        Self::Validate,
        Self::SetName,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Entity => "$entity",
            Self::EntityId => "$entityId",
            Self::CreatePath => "$createPath",
            Self::UpdatePath => "$updatePath",
            Self::DeletePath => "$deletePath",
            Self::Validate => "$validate",
            Self::SetName => "$setName",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.key() == key)
    }
}

/// Decoded meaning of a mapping key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// Ordinary data key
    Plain,
    /// `$json`: serialize the value into the parent
    Json,
    /// `$dataset`: list of values to `[{name, value}]` text
    Dataset,
    /// `$datasetCsv`: CSV file rows as JSON text
    DatasetCsv,
    /// `$fileContent*`: raw text of a local file
    FileContent,
    /// `$id`: reference to another object's id
    Id,
    /// `$deleteIds`: explicit deletes
    DeleteIds,
    /// Declaration metadata, consumed by the enclosing declaration
    Metadata(MetadataKey),
    /// `$<alias>`: resource declaration
    Declare(&'a str),
}

impl<'a> Directive<'a> {
    /// Decode a mapping key.
    pub fn decode(key: &'a str) -> Self {
        let Some(alias) = key.strip_prefix('$') else {
            return Self::Plain;
        };
        match key {
            "$json" => Self::Json,
            "$dataset" => Self::Dataset,
            "$datasetCsv" => Self::DatasetCsv,
            "$id" => Self::Id,
            "$deleteIds" => Self::DeleteIds,
            _ if key.starts_with("$fileContent") => Self::FileContent,
            _ => match MetadataKey::from_key(key) {
                Some(meta) => Self::Metadata(meta),
                None => Self::Declare(alias),
            },
        }
    }
}
