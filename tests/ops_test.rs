use nu_plugin_medidores::ops;
use nu_plugin_medidores::pipeline::app_state::ViewConfig;
use nu_plugin_medidores::pipeline::filter::CriteriaParams;
use serde_json::{json, Value};

fn sample_records() -> Vec<Value> {
    vec![
        json!({"SiglaUf": "SP", "Municipio": "São Paulo", "LocalVerificacao": "Av. Paulista, 1000",
               "UltimoResultado": "Aprovado", "TipoMedidor": "Radar Fixo",
               "DataUltimaVerificacao": "15/08/2024", "DataValidade": "14/08/2025",
               "Faixas": [{"NumeroFaixa": "1", "VelocidadeNominal": "60"}]}),
        json!({"estado": "RJ", "cidade": "Rio de Janeiro", "local": "Av. Atlântica",
               "status": "Reprovado", "tipo": "Lombada Eletrônica",
               "dataVerificacao": "20/07/2024", "dataValidade": "01/01/2020",
               "velocidade_maxima": "40", "proprietario": "CET-Rio"}),
        json!({"stateCode": "MG", "city": "Belo Horizonte", "verificationSite": "Av. Afonso Pena",
               "lastResult": "Aprovado", "instrumentType": "Radar Fixo",
               "lastVerificationDate": "10/09/2024", "validUntilDate": "01/01/2099",
               "lanes": [{"nominalSpeed": 80}], "owner": {"name": "BHTrans"}}),
        json!({"SiglaUf": "SP", "Municipio": "Campinas", "UltimoResultado": "Válido",
               "TipoMedidor": "Radar Móvel", "DataUltimaVerificacao": "01/02/2023",
               "DataValidade": "01/02/2024", "Proprietario": "DER-SP"}),
    ]
}

fn cities(v: &Value) -> Vec<&str> {
    v.as_array()
        .unwrap()
        .iter()
        .map(|r| r["city"].as_str().unwrap())
        .collect()
}

fn criteria(state: Option<&str>, search: Option<&str>) -> CriteriaParams {
    CriteriaParams {
        state: state.map(String::from),
        search: search.map(String::from),
        ..Default::default()
    }
}

#[test]
fn ops_normalize_unifies_naming_conventions() {
    let result = ops::op_normalize(&sample_records()).unwrap();
    let arr = result.as_array().unwrap();
    assert_eq!(arr.len(), 4);
    assert_eq!(arr[0]["stateCode"], "SP");
    assert_eq!(arr[0]["stateName"], "São Paulo");
    assert_eq!(arr[1]["stateCode"], "RJ");
    assert_eq!(arr[1]["lastResult"], "Rejected");
    assert_eq!(arr[1]["owner"]["name"], "CET-Rio");
    assert_eq!(arr[1]["lanes"][0]["nominalSpeed"], 40.0);
    assert_eq!(arr[2]["owner"]["name"], "BHTrans");
    assert_eq!(arr[3]["lastResult"], "Approved");
    assert_eq!(arr[3]["rawResult"], "Válido");
    assert_eq!(arr[3]["verificationSite"], "N/A");
}

#[test]
fn ops_normalize_is_stable_on_canonical_output() {
    let once = ops::op_normalize(&sample_records()).unwrap();
    let twice = ops::op_normalize(once.as_array().unwrap()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn ops_valido_and_aprovado_are_both_approved() {
    let rows = vec![json!({"status": "Válido"}), json!({"UltimoResultado": "Aprovado"})];
    let result = ops::op_normalize(&rows).unwrap();
    for row in result.as_array().unwrap() {
        assert_eq!(row["lastResult"], "Approved");
    }
}

#[test]
fn ops_filter_by_state_keeps_order() {
    let result = ops::op_filter(&sample_records(), criteria(Some("sp"), None)).unwrap();
    assert_eq!(cities(&result), ["São Paulo", "Campinas"]);
}

#[test]
fn ops_filter_free_text_matches_city() {
    let rows = vec![
        json!({"SiglaUf": "SP", "Municipio": "São Paulo"}),
        json!({"SiglaUf": "RJ", "Municipio": "Rio de Janeiro"}),
    ];
    let result = ops::op_filter(&rows, criteria(None, Some("paulo"))).unwrap();
    assert_eq!(cities(&result), ["São Paulo"]);
}

#[test]
fn ops_filter_is_idempotent() {
    let rows = sample_records();
    let params = || CriteriaParams {
        result: Some("approved".into()),
        instrument_type: Some("radar".into()),
        ..Default::default()
    };
    let once = ops::op_filter(&rows, params()).unwrap();
    let twice = ops::op_filter(once.as_array().unwrap(), params()).unwrap();
    assert_eq!(once, twice);
    assert_eq!(cities(&once), ["São Paulo", "Belo Horizonte", "Campinas"]);
}

#[test]
fn ops_filter_date_and_speed_ranges() {
    let params = CriteriaParams {
        date_from: Some("2024-07-01".into()),
        date_to: Some("31/08/2024".into()),
        speed_min: Some(50.0),
        ..Default::default()
    };
    let result = ops::op_filter(&sample_records(), params).unwrap();
    assert_eq!(cities(&result), ["São Paulo"]);
}

#[test]
fn ops_filter_rejects_bad_input() {
    let bad_date = CriteriaParams {
        date_from: Some("yesterday".into()),
        ..Default::default()
    };
    assert!(ops::op_filter(&sample_records(), bad_date).is_err());
    let bad_region = CriteriaParams {
        region: Some("oeste".into()),
        ..Default::default()
    };
    assert!(ops::op_filter(&sample_records(), bad_region).is_err());
}

#[test]
fn ops_metrics_counts_and_expired() {
    let result = ops::op_metrics(&sample_records()).unwrap();
    assert_eq!(result["total"], 4);
    assert_eq!(result["approvedCount"], 3);
    assert_eq!(result["rejectedCount"], 1);
    assert_eq!(result["approvalRate"], "75.0");
    assert_eq!(result["rejectionRate"], "25.0");
    assert_eq!(result["distinctStateCount"], 3);
    assert_eq!(result["distinctCityCount"], 4);
    // 01/01/2020 and 01/02/2024 have passed, 01/01/2099 has not, and
    // 14/08/2025 is in the past by the time these tests run.
    assert_eq!(result["expiredCount"], 3);
    assert_eq!(result["averageNominalSpeed"], 60);
}

#[test]
fn ops_metrics_empty_is_zero() {
    let result = ops::op_metrics(&[]).unwrap();
    assert_eq!(result["total"], 0);
    assert_eq!(result["approvalRate"], "0.0");
    assert_eq!(result["rejectionRate"], "0.0");
    assert_eq!(result["expiredRate"], "0.0");
    assert_eq!(result["averageNominalSpeed"], 0);
}

#[test]
fn ops_metrics_rate_rounding() {
    let rows: Vec<Value> = (0..7)
        .map(|i| json!({"status": if i < 3 { "Aprovado" } else { "Reprovado" }}))
        .collect();
    let result = ops::op_metrics(&rows).unwrap();
    assert_eq!(result["approvalRate"], "42.9");
    assert_eq!(result["rejectionRate"], "57.1");
}

#[test]
fn ops_top_ranks_states() {
    let result = ops::op_top(&sample_records(), "state", 2).unwrap();
    assert_eq!(result, json!([
        {"value": "São Paulo", "count": 2},
        {"value": "Rio de Janeiro", "count": 1},
    ]));
}

#[test]
fn ops_top_unknown_category() {
    assert!(ops::op_top(&sample_records(), "colour", 5).is_err());
}

#[test]
fn ops_trends_has_all_results() {
    let result = ops::op_trends(&sample_records(), 3).unwrap();
    let dist = result["resultDistribution"].as_array().unwrap();
    assert_eq!(dist.len(), 3);
    assert_eq!(result["verificationsByYear"].as_array().unwrap().len(), 3);
    let months: Vec<&str> = result["validityByMonth"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["value"].as_str().unwrap())
        .collect();
    assert_eq!(months, ["2020-01", "2024-02", "2025-08", "2099-01"]);
}

#[test]
fn ops_sort_is_stable() {
    let rows = vec![
        json!({"city": "Campinas", "verificationSite": "first"}),
        json!({"city": "Americana", "verificationSite": "x"}),
        json!({"city": "campinas", "verificationSite": "second"}),
    ];
    let result = ops::op_sort(&rows, "city", "asc").unwrap();
    let sites: Vec<&str> = result
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["verificationSite"].as_str().unwrap())
        .collect();
    assert_eq!(sites, ["x", "first", "second"]);
}

#[test]
fn ops_sort_speed_desc_missing_last() {
    let result = ops::op_sort(&sample_records(), "lanes.nominalSpeed", "desc").unwrap();
    assert_eq!(cities(&result), ["Belo Horizonte", "São Paulo", "Rio de Janeiro", "Campinas"]);
}

#[test]
fn ops_sort_unknown_column() {
    assert!(ops::op_sort(&sample_records(), "colour", "asc").is_err());
    assert!(ops::op_sort(&sample_records(), "city", "sideways").is_err());
}

#[test]
fn ops_paginate_clamps_out_of_range() {
    let rows: Vec<Value> = (0..25).map(|i| json!({"city": format!("c{i}")})).collect();
    let result = ops::op_paginate(&rows, 999, 10, 2).unwrap();
    assert_eq!(result["page"], 3);
    assert_eq!(result["totalPages"], 3);
    assert_eq!(result["startIndex"], 20);
    assert_eq!(result["endIndex"], 25);
    assert_eq!(
        cities(&result["items"]),
        ["c20", "c21", "c22", "c23", "c24"]
    );
    assert_eq!(result["window"], json!([1, 2, 3]));
}

#[test]
fn ops_export_csv_quotes_everything() {
    let rows = vec![json!({"SiglaUf": "SP", "Municipio": "São Paulo", "LocalVerificacao": "Rua \"A\", 10"})];
    let result = ops::op_export(&rows, "csv").unwrap();
    let content = result["content"].as_str().unwrap();
    let mut lines = content.lines();
    assert!(lines.next().unwrap().starts_with("\"stateCode\",\"stateName\",\"city\""));
    assert!(lines.next().unwrap().contains("\"Rua \"\"A\"\", 10\""));
    let name = result["fileName"].as_str().unwrap();
    assert!(name.starts_with("dados-inmetro-") && name.ends_with(".csv"));
}

#[test]
fn ops_export_json_is_canonical() {
    let text = ops::op_export_text(&sample_records(), "json").unwrap();
    let parsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, ops::op_normalize(&sample_records()).unwrap());
    assert!(ops::op_export_text(&sample_records(), "xml").is_err());
}

#[test]
fn ops_lookup_and_distinct() {
    let result = ops::op_lookup(&sample_records(), "type", "radar fixo").unwrap();
    assert_eq!(cities(&result), ["São Paulo", "Belo Horizonte"]);
    let states = ops::op_distinct(&sample_records(), "state").unwrap();
    assert_eq!(states, json!(["Minas Gerais", "Rio de Janeiro", "São Paulo"]));
}

#[test]
fn ops_query_full_pass() {
    let params = ops::QueryParams {
        criteria: CriteriaParams {
            result: Some("approved".into()),
            ..Default::default()
        },
        sort: Some("city".into()),
        direction: Some("desc".into()),
        page: Some(1),
        page_size: Some(2),
    };
    let result = ops::op_query(&sample_records(), params, &ViewConfig::default()).unwrap();
    assert_eq!(result["metrics"]["total"], 3);
    assert_eq!(result["page"]["totalPages"], 2);
    assert_eq!(cities(&result["page"]["items"]), ["São Paulo", "Campinas"]);
    assert_eq!(result["sort"]["direction"], "desc");
    assert_eq!(result["rankings"]["states"][0]["value"], "São Paulo");
}

#[test]
fn ops_view_rows_have_status_class() {
    let result = ops::op_view(&sample_records()).unwrap();
    let classes: Vec<&str> = result
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["statusClass"].as_str().unwrap())
        .collect();
    assert_eq!(classes, ["aprovado", "reprovado", "aprovado", "aprovado"]);
}

#[cfg(not(feature = "cache"))]
#[test]
fn ops_cache_disabled_is_error() {
    assert!(ops::op_cache_info("x.db").is_err());
}

#[cfg(feature = "cache")]
#[test]
fn ops_cache_round_trip() {
    use nu_plugin_medidores::pipeline::source::DataOrigin;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.db");
    let path = path.to_str().unwrap();
    ops::store_rows(path, DataOrigin::Network, &sample_records()).unwrap();
    let rows = ops::cached_rows(path, None).unwrap().unwrap();
    assert_eq!(rows, sample_records());

    let info = ops::op_cache_info(path).unwrap();
    assert_eq!(info["total"], 1);
    let cleared = ops::op_cache_clear(path, Some("network")).unwrap();
    assert_eq!(cleared["deleted"], 1);
    assert!(ops::cached_rows(path, None).unwrap().is_none());
    assert!(ops::op_cache_clear(path, Some("moon")).is_err());
}

#[test]
fn ops_query_agrees_with_filter_on_missing_state() {
    let rows = vec![json!({"Municipio": "A"}), json!({"SiglaUf": "SP", "Municipio": "B"})];
    let filtered = ops::op_filter(&rows, criteria(Some("N/A"), None)).unwrap();
    assert_eq!(cities(&filtered), ["A"]);
    let params = ops::QueryParams {
        criteria: criteria(Some("N/A"), None),
        ..Default::default()
    };
    let result = ops::op_query(&rows, params, &ViewConfig::default()).unwrap();
    assert_eq!(result["metrics"]["total"], 1);
}

#[test]
fn ops_trends_with_huge_year_count() {
    let result = ops::op_trends(&sample_records(), usize::MAX).unwrap();
    let years = result["verificationsByYear"].as_array().unwrap();
    assert!(!years.is_empty());
    assert!(years.len() <= 1000);
}
