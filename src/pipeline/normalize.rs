//! Map heterogeneous raw records onto the canonical [`Record`] schema.
//!
//! The dataset has carried at least three naming conventions: the canonical
//! camelCase names, PascalCase administrative names from the open-data feed,
//! and lowercase UI names from the hand-maintained sample. Each canonical
//! field has one alias list below; the first non-empty value wins.

use rayon::prelude::*;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use super::record::{
    is_unknown, DateField, HistoryEntry, Lane, Owner, Record, VerificationResult, UNKNOWN,
};
use super::states;

const STATE_CODE: &[&str] = &["stateCode", "SiglaUf", "siglaUf", "uf", "UF", "sigla"];
const STATE_NAME: &[&str] = &["stateName", "Estado", "nomeEstado", "NomeEstado"];
/// `estado` holds a code in some exports and a name in others.
const STATE_EITHER: &[&str] = &["estado"];
const CITY: &[&str] = &["city", "Municipio", "municipio", "cidade", "Cidade"];
const SITE: &[&str] = &["verificationSite", "LocalVerificacao", "localVerificacao", "local", "endereco"];
const LAST_VERIFICATION: &[&str] = &[
    "lastVerificationDate",
    "DataUltimaVerificacao",
    "dataUltimaVerificacao",
    "dataVerificacao",
    "DataCalibracao",
    "dataCalibracao",
    "data_aprovacao",
    "data_certificacao",
];
const VALID_UNTIL: &[&str] = &["validUntilDate", "DataValidade", "dataValidade", "validade"];
/// The source spelling is preferred so re-normalizing keeps `rawResult`.
const RESULT: &[&str] = &["rawResult", "lastResult", "UltimoResultado", "ultimoResultado", "status", "resultado"];
const TYPE: &[&str] = &["instrumentType", "TipoMedidor", "tipoMedidor", "tipo", "Tipo"];
const CODE: &[&str] = &["verificationCode", "CodigoVerificacao", "codigoVerificacao", "codigo"];
const TECHNICIAN: &[&str] = &["technician", "ResponsavelTecnico", "responsavelTecnico", "responsavel"];
const LANES: &[&str] = &["lanes", "Faixas", "faixas"];
const HISTORY: &[&str] = &["history", "Historico", "historico"];
const OWNER: &[&str] = &["owner", "Proprietario", "proprietario", "RazaoSocial", "razaoSocial"];

const LANE_NUMBER: &[&str] = &["laneNumber", "NumeroFaixa", "numeroFaixa", "faixa"];
const LANE_REGISTRY: &[&str] = &["registryNumber", "NumeroInmetro", "numeroInmetro", "inmetro"];
const LANE_SERIAL: &[&str] = &["serialNumber", "NumeroSerie", "numeroSerie", "serie"];
const LANE_DIRECTION: &[&str] = &["direction", "Sentido", "sentido"];
const LANE_SPEED: &[&str] = &[
    "nominalSpeed",
    "VelocidadeNominal",
    "velocidadeNominal",
    "velocidade_maxima",
    "velocidade",
];

const OWNER_NAME: &[&str] = &["name", "Nome", "nome", "RazaoSocial", "razaoSocial"];
const OWNER_CITY: &[&str] = &["city", "Municipio", "municipio", "cidade"];
const OWNER_STATE: &[&str] = &["state", "SiglaUf", "Estado", "estado", "uf"];

const HISTORY_DATE: &[&str] = &["date", "Data", "data", "DataVerificacao", "dataVerificacao"];
const HISTORY_RESULT: &[&str] = &["rawResult", "result", "Resultado", "resultado", "status"];
const HISTORY_SITE: &[&str] = &["site", "Local", "local", "LocalVerificacao"];

/// Normalize one raw record. Non-object input yields an all-sentinel record.
pub fn normalize(raw: &Value) -> Record {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let (state_code, state_name) = resolve_state(obj);
    let raw_result = first_text(obj, RESULT).unwrap_or_default();
    let last_result = VerificationResult::parse(&raw_result);

    let lanes = match first_value(obj, LANES) {
        Some(Value::Array(items)) => items.iter().filter_map(normalize_lane).collect(),
        _ => synthesize_lane(obj).into_iter().collect(),
    };
    let history = match first_value(obj, HISTORY) {
        Some(Value::Array(items)) => items.iter().filter_map(normalize_history).collect(),
        _ => Vec::new(),
    };

    Record {
        state_code,
        state_name,
        city: text_or_unknown(obj, CITY),
        verification_site: text_or_unknown(obj, SITE),
        last_verification_date: date_field(obj, LAST_VERIFICATION),
        valid_until_date: date_field(obj, VALID_UNTIL),
        last_result,
        raw_result: if raw_result.is_empty() { UNKNOWN.to_string() } else { raw_result },
        instrument_type: text_or_unknown(obj, TYPE),
        verification_code: text_or_unknown(obj, CODE),
        technician: text_or_unknown(obj, TECHNICIAN),
        lanes,
        history,
        owner: normalize_owner(first_value(obj, OWNER)),
    }
}

/// Normalize a whole raw set in parallel. Output order matches input order.
pub fn normalize_all(raw: &[Value]) -> Vec<Record> {
    let records: Vec<Record> = raw.par_iter().map(normalize).collect();
    tracing::debug!(count = records.len(), "normalized records");
    records
}

/// Parse a speed the way the dashboard did: leading numeric prefix of the
/// text, anything unparsable or negative becomes `0.0`.
pub fn parse_speed(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => leading_number(s),
        _ => 0.0,
    };
    if n.is_finite() && n > 0.0 {
        n
    } else {
        0.0
    }
}

fn leading_number(s: &str) -> f64 {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").ok());
    let normalized = s.trim().replace(',', ".");
    re.as_ref()
        .and_then(|re| re.find(&normalized))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

// ── Field helpers ────────────────────────────────────────────────────────────

/// First present, non-null, non-blank value under any alias.
fn first_value<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().filter_map(|k| obj.get(*k)).find(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    })
}

/// First non-empty textual value. Numbers and booleans are stringified.
fn first_text(obj: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|k| obj.get(*k))
        .find_map(scalar_text)
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_or_unknown(obj: &Map<String, Value>, aliases: &[&str]) -> String {
    first_text(obj, aliases).unwrap_or_else(|| UNKNOWN.to_string())
}

fn date_field(obj: &Map<String, Value>, aliases: &[&str]) -> DateField {
    first_text(obj, aliases)
        .map(|s| DateField::new(&s))
        .unwrap_or_default()
}

fn resolve_state(obj: &Map<String, Value>) -> (String, String) {
    let mut code = first_text(obj, STATE_CODE).filter(|c| !is_unknown(c));
    let mut name = first_text(obj, STATE_NAME).filter(|n| !is_unknown(n));

    if let Some(either) = first_text(obj, STATE_EITHER) {
        if states::by_code(&either).is_some() && either.len() == 2 {
            code.get_or_insert(either);
        } else {
            name.get_or_insert(either);
        }
    }

    let code = code
        .map(|c| c.to_uppercase())
        .or_else(|| name.as_deref().and_then(states::by_name).map(|uf| uf.code.to_string()));
    let name = name.or_else(|| {
        code.as_deref()
            .and_then(states::by_code)
            .map(|uf| uf.name.to_string())
    });

    (
        code.unwrap_or_else(|| UNKNOWN.to_string()),
        name.unwrap_or_else(|| UNKNOWN.to_string()),
    )
}

fn normalize_lane(raw: &Value) -> Option<Lane> {
    let obj = raw.as_object()?;
    Some(Lane {
        lane_number: text_or_unknown(obj, LANE_NUMBER),
        registry_number: text_or_unknown(obj, LANE_REGISTRY),
        serial_number: text_or_unknown(obj, LANE_SERIAL),
        direction: text_or_unknown(obj, LANE_DIRECTION),
        nominal_speed: first_value(obj, LANE_SPEED).map(parse_speed).unwrap_or(0.0),
    })
}

/// Flat records carry lane fields at the top level. Build one lane from them
/// when at least one is present.
fn synthesize_lane(obj: &Map<String, Value>) -> Option<Lane> {
    let speed = first_value(obj, LANE_SPEED);
    let serial = first_text(obj, LANE_SERIAL);
    let registry = first_text(obj, LANE_REGISTRY);
    if speed.is_none() && serial.is_none() && registry.is_none() {
        return None;
    }
    Some(Lane {
        lane_number: first_text(obj, LANE_NUMBER).unwrap_or_else(|| "1".to_string()),
        registry_number: registry.unwrap_or_else(|| UNKNOWN.to_string()),
        serial_number: serial.unwrap_or_else(|| UNKNOWN.to_string()),
        direction: text_or_unknown(obj, LANE_DIRECTION),
        nominal_speed: speed.map(parse_speed).unwrap_or(0.0),
    })
}

fn normalize_history(raw: &Value) -> Option<HistoryEntry> {
    let obj = raw.as_object()?;
    let raw_result = first_text(obj, HISTORY_RESULT).unwrap_or_else(|| UNKNOWN.to_string());
    Some(HistoryEntry {
        date: date_field(obj, HISTORY_DATE),
        result: VerificationResult::parse(&raw_result),
        raw_result,
        site: text_or_unknown(obj, HISTORY_SITE),
    })
}

fn normalize_owner(raw: Option<&Value>) -> Owner {
    match raw {
        Some(Value::Object(obj)) => Owner {
            name: text_or_unknown(obj, OWNER_NAME),
            city: text_or_unknown(obj, OWNER_CITY),
            state: text_or_unknown(obj, OWNER_STATE),
        },
        Some(v) => match scalar_text(v) {
            Some(name) if !is_unknown(&name) && name != "Não informado" => Owner {
                name,
                ..Owner::unknown()
            },
            _ => Owner::unknown(),
        },
        None => Owner::unknown(),
    }
}
