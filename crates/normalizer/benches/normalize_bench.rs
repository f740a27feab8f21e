//! 정규화 처리량 벤치마크

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use pentaflow_normalizer::ResultNormalizer;

fn nuclei_lines(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                r#"{{"template-id":"tpl-{i}","matcher-name":"m","matched-at":"http://x/{i}","info":{{"name":"Finding {i}","severity":"medium"}}}}"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn nmap_xml(ports: usize) -> String {
    let body: String = (1..=ports)
        .map(|p| {
            format!(
                r#"<port protocol="tcp" portid="{p}"><state state="open"/><service name="svc{p}"/></port>"#
            )
        })
        .collect();
    format!("<nmaprun><host><ports>{body}</ports></host></nmaprun>")
}

fn bench_normalize(c: &mut Criterion) {
    let normalizer = ResultNormalizer::with_default_parsers();
    let mut group = c.benchmark_group("normalize");

    for size in [10usize, 100, 1000] {
        let nuclei = nuclei_lines(size);
        group.throughput(Throughput::Bytes(nuclei.len() as u64));
        group.bench_with_input(BenchmarkId::new("nuclei_ndjson", size), &nuclei, |b, raw| {
            b.iter(|| normalizer.normalize("nuclei", Some(black_box(raw.as_bytes()))));
        });

        let nmap = nmap_xml(size);
        group.throughput(Throughput::Bytes(nmap.len() as u64));
        group.bench_with_input(BenchmarkId::new("nmap_xml", size), &nmap, |b, raw| {
            b.iter(|| normalizer.normalize("nmap", Some(black_box(raw.as_bytes()))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
