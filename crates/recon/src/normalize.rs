//! Header normalization: arbitrary spreadsheet headers → the fixed schema.

/// The canonical fields a sheet column can map onto.
///
/// Adding a field means adding it here, to [`Field::from_token`], and to
/// `CanonicalRecord`; the decoder matches exhaustively so the compiler
/// flags anything missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SerialNumber,
    Material,
    Unit,
    Quantity,
    Rate,
    Amount,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::SerialNumber,
        Field::Material,
        Field::Unit,
        Field::Quantity,
        Field::Rate,
        Field::Amount,
    ];

    fn from_token(token: &str) -> Option<Field> {
        match token {
            "sno" => Some(Field::SerialNumber),
            "material" => Some(Field::Material),
            "unit" => Some(Field::Unit),
            "quantity" => Some(Field::Quantity),
            "rate" => Some(Field::Rate),
            "amount" => Some(Field::Amount),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SerialNumber => "SerialNumber",
            Self::Material => "Material",
            Self::Unit => "Unit",
            Self::Quantity => "Quantity",
            Self::Rate => "Rate",
            Self::Amount => "Amount",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a raw header onto a canonical field.
///
/// Lowercases and strips every whitespace character, so `"S No"`, `"sno"`
/// and `" SNO "` all land on [`Field::SerialNumber`]. Unknown headers
/// return `None` and the caller drops the column.
pub fn normalize(raw: &str) -> Option<Field> {
    let token: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    Field::from_token(&token)
}
