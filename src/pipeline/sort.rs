//! Stable, type-aware sorting by a dotted field path.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::record::{fold_accents, is_unknown, Lane, Record};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    StateCode,
    StateName,
    City,
    Site,
    RawResult,
    Result,
    Type,
    Code,
    Technician,
    OwnerName,
    OwnerCity,
    OwnerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LaneField {
    Number,
    Registry,
    Serial,
    Direction,
    Speed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Text(TextField),
    LastVerification,
    ValidUntil,
    LaneCount,
    Lane(usize, LaneField),
    HistoryDate(usize),
    HistoryResult(usize),
}

/// A resolved column reference such as `city`, `owner.name`,
/// `validUntilDate`, or `lanes.0.nominalSpeed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    column: Column,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        let raw = path.trim();
        let unknown = || Error::UnknownColumn(raw.to_string());
        let parts: Vec<&str> = raw.split('.').collect();

        let column = match parts.as_slice() {
            [single] => match *single {
                "stateCode" | "uf" | "SiglaUf" => Column::Text(TextField::StateCode),
                "stateName" | "estado" | "Estado" => Column::Text(TextField::StateName),
                "city" | "cidade" | "Municipio" => Column::Text(TextField::City),
                "verificationSite" | "local" | "LocalVerificacao" => Column::Text(TextField::Site),
                "lastResult" | "status" | "UltimoResultado" => Column::Text(TextField::Result),
                "rawResult" => Column::Text(TextField::RawResult),
                "instrumentType" | "tipo" | "TipoMedidor" => Column::Text(TextField::Type),
                "verificationCode" => Column::Text(TextField::Code),
                "technician" => Column::Text(TextField::Technician),
                "owner" | "proprietario" => Column::Text(TextField::OwnerName),
                "lastVerificationDate" | "dataVerificacao" | "DataUltimaVerificacao" => {
                    Column::LastVerification
                }
                "validUntilDate" | "validade" | "dataValidade" | "DataValidade" => Column::ValidUntil,
                "laneCount" => Column::LaneCount,
                "nominalSpeed" | "velocidade_maxima" => Column::Lane(0, LaneField::Speed),
                _ => return Err(unknown()),
            },
            ["owner", field] => Column::Text(match *field {
                "name" => TextField::OwnerName,
                "city" => TextField::OwnerCity,
                "state" => TextField::OwnerState,
                _ => return Err(unknown()),
            }),
            ["lanes", field] => Column::Lane(0, lane_field(field).ok_or_else(unknown)?),
            ["lanes", n, field] => Column::Lane(
                n.parse().map_err(|_| unknown())?,
                lane_field(field).ok_or_else(unknown)?,
            ),
            ["history", n, field] => {
                let n = n.parse().map_err(|_| unknown())?;
                match *field {
                    "date" => Column::HistoryDate(n),
                    "result" => Column::HistoryResult(n),
                    _ => return Err(unknown()),
                }
            }
            _ => return Err(unknown()),
        };
        Ok(Self { raw: raw.to_string(), column })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn key(&self, r: &Record) -> SortKey {
        match self.column {
            Column::Text(f) => SortKey::text(text_value(r, f)),
            Column::LastVerification => SortKey::date(r.last_verification_date.date()),
            Column::ValidUntil => SortKey::date(r.valid_until_date.date()),
            Column::LaneCount => SortKey::Number(r.lanes.len() as f64),
            Column::Lane(i, f) => r.lanes.get(i).map_or(SortKey::Missing, |l| lane_key(l, f)),
            Column::HistoryDate(i) => SortKey::date(r.history.get(i).and_then(|h| h.date.date())),
            Column::HistoryResult(i) => r
                .history
                .get(i)
                .map_or(SortKey::Missing, |h| SortKey::text(h.result.label())),
        }
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn lane_field(s: &str) -> Option<LaneField> {
    match s {
        "laneNumber" => Some(LaneField::Number),
        "registryNumber" => Some(LaneField::Registry),
        "serialNumber" => Some(LaneField::Serial),
        "direction" => Some(LaneField::Direction),
        "nominalSpeed" => Some(LaneField::Speed),
        _ => None,
    }
}

fn text_value(r: &Record, f: TextField) -> &str {
    match f {
        TextField::StateCode => &r.state_code,
        TextField::StateName => &r.state_name,
        TextField::City => &r.city,
        TextField::Site => &r.verification_site,
        TextField::RawResult => &r.raw_result,
        TextField::Result => r.last_result.label(),
        TextField::Type => &r.instrument_type,
        TextField::Code => &r.verification_code,
        TextField::Technician => &r.technician,
        TextField::OwnerName => &r.owner.name,
        TextField::OwnerCity => &r.owner.city,
        TextField::OwnerState => &r.owner.state,
    }
}

fn lane_key(lane: &Lane, f: LaneField) -> SortKey {
    match f {
        LaneField::Number => SortKey::text(&lane.lane_number),
        LaneField::Registry => SortKey::text(&lane.registry_number),
        LaneField::Serial => SortKey::text(&lane.serial_number),
        LaneField::Direction => SortKey::text(&lane.direction),
        LaneField::Speed if lane.nominal_speed > 0.0 => SortKey::Number(lane.nominal_speed),
        LaneField::Speed => SortKey::Missing,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Text(String),
    Date(NaiveDate),
    Number(f64),
    Missing,
}

impl SortKey {
    fn text(s: &str) -> Self {
        if is_unknown(s) {
            Self::Missing
        } else {
            Self::Text(fold_accents(&s.trim().to_lowercase()))
        }
    }

    fn date(d: Option<NaiveDate>) -> Self {
        d.map_or(Self::Missing, Self::Date)
    }

    /// Present keys compare in `direction`; missing keys always go last.
    fn compare(&self, other: &Self, direction: SortDirection) -> Ordering {
        let ord = match (self, other) {
            (Self::Missing, Self::Missing) => return Ordering::Equal,
            (Self::Missing, _) => return Ordering::Greater,
            (_, Self::Missing) => return Ordering::Less,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            // One column always yields one key type.
            _ => Ordering::Equal,
        };
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::from_str(s).ok_or_else(|| Error::UnknownOption {
            kind: "direction",
            value: s.to_string(),
            expected: "asc, desc",
        })
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Active sort column and direction of a table view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortState {
    pub column: FieldPath,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: FieldPath, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Header click: the active column flips direction, any other column
    /// becomes active ascending.
    pub fn click(current: Option<&SortState>, column: FieldPath) -> SortState {
        match current {
            Some(s) if s.column == column => SortState::new(column, s.direction.toggle()),
            _ => SortState::new(column, SortDirection::Asc),
        }
    }
}

/// Reorder `positions` (indices into `records`) by the column. Stable.
pub fn sort_positions(records: &[Record], positions: &mut [usize], path: &FieldPath, direction: SortDirection) {
    let mut keyed: Vec<(SortKey, usize)> = positions.iter().map(|&i| (path.key(&records[i]), i)).collect();
    keyed.sort_by(|a, b| a.0.compare(&b.0, direction));
    for (slot, (_, i)) in positions.iter_mut().zip(keyed) {
        *slot = i;
    }
}

/// Sorted copy of `records`. Equal keys keep their relative order.
pub fn sort(records: &[Record], path: &FieldPath, direction: SortDirection) -> Vec<Record> {
    let mut positions: Vec<usize> = (0..records.len()).collect();
    sort_positions(records, &mut positions, path, direction);
    tracing::debug!(column = path.as_str(), ?direction, count = records.len(), "sorted records");
    positions.into_iter().map(|i| records[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::normalize;
    use serde_json::{json, Value};

    fn norm(values: &[Value]) -> Vec<Record> {
        values.iter().map(normalize).collect()
    }

    fn col(p: &str) -> FieldPath {
        FieldPath::parse(p).unwrap()
    }

    fn codes(rs: &[Record]) -> Vec<&str> {
        rs.iter().map(|r| r.verification_code.as_str()).collect()
    }

    #[test]
    fn stable_for_equal_keys() {
        let rs = norm(&[
            json!({"codigo": "1", "cidade": "A"}),
            json!({"codigo": "2", "cidade": "A"}),
        ]);
        assert_eq!(codes(&sort(&rs, &col("city"), SortDirection::Asc)), ["1", "2"]);
        assert_eq!(codes(&sort(&rs, &col("city"), SortDirection::Desc)), ["1", "2"]);
    }

    #[test]
    fn dates_compare_as_calendar_values() {
        let rs = norm(&[
            json!({"codigo": "a", "DataValidade": "02/01/2025"}),
            json!({"codigo": "b", "DataValidade": "10/12/2024"}),
            json!({"codigo": "c", "DataValidade": "01/03/2025"}),
        ]);
        // Lexicographic order would be a, c, b.
        assert_eq!(codes(&sort(&rs, &col("validUntilDate"), SortDirection::Asc)), ["b", "a", "c"]);
        assert_eq!(codes(&sort(&rs, &col("validUntilDate"), SortDirection::Desc)), ["c", "a", "b"]);
    }

    #[test]
    fn missing_keys_sort_last_both_ways() {
        let rs = norm(&[
            json!({"codigo": "x"}),
            json!({"codigo": "b", "cidade": "Bauru"}),
            json!({"codigo": "a", "cidade": "Atibaia"}),
        ]);
        assert_eq!(codes(&sort(&rs, &col("city"), SortDirection::Asc)), ["a", "b", "x"]);
        assert_eq!(codes(&sort(&rs, &col("city"), SortDirection::Desc)), ["b", "a", "x"]);
    }

    #[test]
    fn nested_paths() {
        let rs = norm(&[
            json!({"codigo": "1", "owner": {"name": "Zeta"}, "Faixas": [{"VelocidadeNominal": "80"}]}),
            json!({"codigo": "2", "owner": {"name": "alfa"}, "Faixas": [{"VelocidadeNominal": "100"}]}),
        ]);
        assert_eq!(codes(&sort(&rs, &col("owner.name"), SortDirection::Asc)), ["2", "1"]);
        assert_eq!(codes(&sort(&rs, &col("lanes.0.nominalSpeed"), SortDirection::Asc)), ["1", "2"]);
        assert_eq!(codes(&sort(&rs, &col("lanes.nominalSpeed"), SortDirection::Desc)), ["2", "1"]);
    }

    #[test]
    fn accents_do_not_break_order() {
        let rs = norm(&[
            json!({"codigo": "1", "cidade": "Uberaba"}),
            json!({"codigo": "2", "cidade": "Águas Claras"}),
        ]);
        assert_eq!(codes(&sort(&rs, &col("city"), SortDirection::Asc)), ["2", "1"]);
    }

    #[test]
    fn unknown_columns_rejected() {
        assert!(FieldPath::parse("color").is_err());
        assert!(FieldPath::parse("owner.phone").is_err());
        assert!(FieldPath::parse("lanes.x.direction").is_err());
        assert!(FieldPath::parse("history.0.date").is_ok());
        assert!(SortDirection::parse("sideways").is_err());
    }

    #[test]
    fn click_toggles_active_column() {
        let first = SortState::click(None, col("city"));
        assert_eq!(first.direction, SortDirection::Asc);
        let second = SortState::click(Some(&first), col("city"));
        assert_eq!(second.direction, SortDirection::Desc);
        let third = SortState::click(Some(&second), col("stateCode"));
        assert_eq!(third.direction, SortDirection::Asc);
        assert_eq!(third.column.as_str(), "stateCode");
    }

    #[test]
    fn repeated_toggles_are_deterministic() {
        let rs = norm(&[
            json!({"codigo": "1", "SiglaUf": "SP"}),
            json!({"codigo": "2", "SiglaUf": "RJ"}),
            json!({"codigo": "3", "SiglaUf": "SP"}),
        ]);
        let asc = sort(&rs, &col("stateCode"), SortDirection::Asc);
        let desc = sort(&asc, &col("stateCode"), SortDirection::Desc);
        let asc_again = sort(&desc, &col("stateCode"), SortDirection::Asc);
        assert_eq!(codes(&asc), ["2", "1", "3"]);
        assert_eq!(codes(&desc), ["1", "3", "2"]);
        assert_eq!(codes(&asc_again), ["2", "1", "3"]);
    }
}
