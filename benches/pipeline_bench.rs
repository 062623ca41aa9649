use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nu_plugin_medidores::pipeline::filter::{filter_indexed, filter_positions, FilterCriteria};
use nu_plugin_medidores::pipeline::index::RecordIndex;
use nu_plugin_medidores::pipeline::metrics::compute_metrics;
use nu_plugin_medidores::pipeline::normalize::normalize_all;
use nu_plugin_medidores::pipeline::sort::{sort, FieldPath, SortDirection};
use serde_json::{json, Value};

/// Generate synthetic raw rows in both naming conventions.
fn generate_rows(n: usize) -> Vec<Value> {
    let places = [
        ("SP", "São Paulo"),
        ("RJ", "Rio de Janeiro"),
        ("MG", "Belo Horizonte"),
        ("RS", "Porto Alegre"),
        ("BA", "Salvador"),
        ("PE", "Recife"),
        ("PR", "Curitiba"),
        ("DF", "Brasília"),
    ];
    (0..n)
        .map(|i| {
            let (uf, city) = places[i % places.len()];
            let day = i % 28 + 1;
            let month = i % 12 + 1;
            if i % 3 == 0 {
                json!({"estado": uf, "cidade": city, "local": format!("Rua {i}"),
                       "status": if i % 5 == 0 { "Inválido" } else { "Válido" },
                       "tipo": "Radar Fixo", "dataVerificacao": format!("{day:02}/{month:02}/2024"),
                       "dataValidade": format!("{day:02}/{month:02}/2025"),
                       "velocidade_maxima": format!("{}", 40 + (i % 5) * 10)})
            } else {
                json!({"SiglaUf": uf, "Municipio": city, "LocalVerificacao": format!("Av. {i}"),
                       "UltimoResultado": if i % 7 == 0 { "Reprovado" } else { "Aprovado" },
                       "TipoMedidor": "Lombada Eletrônica",
                       "DataUltimaVerificacao": format!("{day:02}/{month:02}/2023"),
                       "DataValidade": format!("{day:02}/{month:02}/2024"),
                       "Faixas": [{"NumeroFaixa": "1", "VelocidadeNominal": format!("{}", 30 + i % 60)}]})
            }
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for size in [1000, 10000] {
        let rows = generate_rows(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, r| {
            b.iter(|| black_box(normalize_all(r)))
        });
    }
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let records = normalize_all(&generate_rows(10000));
    let index = RecordIndex::build(&records);
    let criteria = FilterCriteria {
        state: Some("SP".into()),
        result_category: Some("approved".into()),
        free_text: Some("av.".into()),
        ..Default::default()
    };

    c.bench_function("filter/scan_10000", |b| {
        b.iter(|| black_box(filter_positions(&records, &criteria)))
    });
    c.bench_function("filter/indexed_10000", |b| {
        b.iter(|| black_box(filter_indexed(&records, &index, &criteria)))
    });
    c.bench_function("index/build_10000", |b| {
        b.iter(|| black_box(RecordIndex::build(&records)))
    });
}

fn bench_metrics(c: &mut Criterion) {
    let records = normalize_all(&generate_rows(10000));
    c.bench_function("metrics/10000", |b| {
        b.iter(|| black_box(compute_metrics(&records)))
    });
}

fn bench_sort(c: &mut Criterion) {
    let records = normalize_all(&generate_rows(10000));
    let mut group = c.benchmark_group("sort_10000");
    for column in ["city", "validUntilDate", "lanes.nominalSpeed"] {
        let path = FieldPath::parse(column).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(column), &path, |b, p| {
            b.iter(|| black_box(sort(&records, p, SortDirection::Desc)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_filter, bench_metrics, bench_sort);
criterion_main!(benches);
