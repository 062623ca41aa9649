//! Brazilian federative units: the 26 states plus the federal district.

use serde::{Deserialize, Serialize};

/// Macro-region a federative unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    Norte,
    Nordeste,
    CentroOeste,
    Sudeste,
    Sul,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Norte => "norte",
            Self::Nordeste => "nordeste",
            Self::CentroOeste => "centro-oeste",
            Self::Sudeste => "sudeste",
            Self::Sul => "sul",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "norte" | "north" => Some(Self::Norte),
            "nordeste" | "northeast" => Some(Self::Nordeste),
            "centro-oeste" | "centro_oeste" | "centrooeste" | "center-west" => {
                Some(Self::CentroOeste)
            }
            "sudeste" | "southeast" => Some(Self::Sudeste),
            "sul" | "south" => Some(Self::Sul),
            _ => None,
        }
    }

    pub fn all_names() -> &'static [&'static str] {
        &["norte", "nordeste", "centro-oeste", "sudeste", "sul"]
    }
}

/// One federative unit.
#[derive(Debug, Clone, Copy)]
pub struct Uf {
    pub code: &'static str,
    pub name: &'static str,
    pub region: Region,
}

pub const ALL_UFS: [Uf; 27] = [
    Uf { code: "AC", name: "Acre", region: Region::Norte },
    Uf { code: "AL", name: "Alagoas", region: Region::Nordeste },
    Uf { code: "AP", name: "Amapá", region: Region::Norte },
    Uf { code: "AM", name: "Amazonas", region: Region::Norte },
    Uf { code: "BA", name: "Bahia", region: Region::Nordeste },
    Uf { code: "CE", name: "Ceará", region: Region::Nordeste },
    Uf { code: "DF", name: "Distrito Federal", region: Region::CentroOeste },
    Uf { code: "ES", name: "Espírito Santo", region: Region::Sudeste },
    Uf { code: "GO", name: "Goiás", region: Region::CentroOeste },
    Uf { code: "MA", name: "Maranhão", region: Region::Nordeste },
    Uf { code: "MT", name: "Mato Grosso", region: Region::CentroOeste },
    Uf { code: "MS", name: "Mato Grosso do Sul", region: Region::CentroOeste },
    Uf { code: "MG", name: "Minas Gerais", region: Region::Sudeste },
    Uf { code: "PA", name: "Pará", region: Region::Norte },
    Uf { code: "PB", name: "Paraíba", region: Region::Nordeste },
    Uf { code: "PR", name: "Paraná", region: Region::Sul },
    Uf { code: "PE", name: "Pernambuco", region: Region::Nordeste },
    Uf { code: "PI", name: "Piauí", region: Region::Nordeste },
    Uf { code: "RJ", name: "Rio de Janeiro", region: Region::Sudeste },
    Uf { code: "RN", name: "Rio Grande do Norte", region: Region::Nordeste },
    Uf { code: "RS", name: "Rio Grande do Sul", region: Region::Sul },
    Uf { code: "RO", name: "Rondônia", region: Region::Norte },
    Uf { code: "RR", name: "Roraima", region: Region::Norte },
    Uf { code: "SC", name: "Santa Catarina", region: Region::Sul },
    Uf { code: "SP", name: "São Paulo", region: Region::Sudeste },
    Uf { code: "SE", name: "Sergipe", region: Region::Nordeste },
    Uf { code: "TO", name: "Tocantins", region: Region::Norte },
];

/// All 27 codes in table order (the order used when fetching).
pub fn all_codes() -> Vec<String> {
    ALL_UFS.iter().map(|uf| uf.code.to_string()).collect()
}

pub fn by_code(code: &str) -> Option<&'static Uf> {
    let code = code.trim();
    ALL_UFS.iter().find(|uf| uf.code.eq_ignore_ascii_case(code))
}

pub fn by_name(name: &str) -> Option<&'static Uf> {
    let name = name.trim().to_lowercase();
    ALL_UFS.iter().find(|uf| uf.name.to_lowercase() == name)
}
