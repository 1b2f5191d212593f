use geobench::codec::encode;
use geobench::config::{IngestConfig, LONDON_BOUNDS};
use geobench::index::{Document, PointsEncoding};
use geobench::prelude::*;
use geobench::{Region, SegmentedIndex};
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic points spread over the query grid.
fn london_points(n: usize) -> Vec<(String, f64, f64)> {
    let lat_span = LONDON_BOUNDS.max_lat - LONDON_BOUNDS.min_lat;
    let lon_span = LONDON_BOUNDS.max_lon - LONDON_BOUNDS.min_lon;
    (0..n)
        .map(|i| {
            let a = (i * 7919 % 1000) as f64 / 1000.0;
            let b = (i * 104_729 % 997) as f64 / 997.0;
            (
                format!("node:{}", i),
                LONDON_BOUNDS.min_lat + a * lat_span,
                LONDON_BOUNDS.min_lon + b * lon_span,
            )
        })
        .collect()
}

fn as_lines(points: &[(String, f64, f64)]) -> String {
    points
        .iter()
        .map(|(id, lat, lon)| format!("{},{},{}\n", id, lat, lon))
        .collect()
}

fn test_config() -> BenchConfig {
    BenchConfig::default().with_iterations(2).with_ingest(IngestConfig {
        workers: 4,
        batch_size: 64,
        doc_cap: None,
        force_merge: false,
    })
}

#[test]
fn test_all_encodings_agree_end_to_end() {
    init_logging();
    let lines = as_lines(&london_points(3000));

    for query in [
        QueryKind::Rect,
        QueryKind::Distance,
        QueryKind::Polygon { gons: 6 },
    ] {
        let mut totals = Vec::new();
        for encoding in [EncodingKind::Postings, EncodingKind::Geo3d, EncodingKind::Points] {
            let config = test_config()
                .with_encoding(encoding)
                .with_query(query.clone());
            let report = geobench::run(config, &mut Cursor::new(lines.as_bytes())).unwrap();
            assert_eq!(report.total_docs(), 3000);
            totals.push(report.throughput.iterations[0].total_hits);
        }
        assert!(totals[0] > 0, "{} found nothing", query.name());
        assert!(
            totals.iter().all(|t| *t == totals[0]),
            "{} totals differ: {:?}",
            query.name(),
            totals
        );
    }
}

#[test]
fn test_box_grid_covers_every_point() {
    init_logging();
    let points = london_points(2000);
    let lines = as_lines(&points);

    let report = geobench::run(test_config(), &mut Cursor::new(lines.as_bytes())).unwrap();
    let stats = &report.throughput.iterations[1];
    // every point lies in at least one inclusive grid cell
    assert!(stats.total_hits >= 2000);
    assert_eq!(stats.query_count, 225);
}

#[test]
fn test_pre_built_and_regenerated_workloads_match() {
    init_logging();
    let lines = as_lines(&london_points(1500));
    let config = test_config().with_query(QueryKind::Polygon { gons: 5 });

    let regenerated = geobench::run(config.clone(), &mut Cursor::new(lines.as_bytes())).unwrap();
    let pre_built = geobench::run(
        config.with_pre_build_queries(true),
        &mut Cursor::new(lines.as_bytes()),
    )
    .unwrap();

    assert_eq!(
        regenerated.throughput.iterations[0].total_hits,
        pre_built.throughput.iterations[0].total_hits
    );
}

#[test]
fn test_filter_and_distance_sort() {
    init_logging();
    let lines = as_lines(&london_points(2000));

    let unfiltered = geobench::run(test_config(), &mut Cursor::new(lines.as_bytes())).unwrap();
    let filtered = geobench::run(
        test_config().with_filter(50.0, 42),
        &mut Cursor::new(lines.as_bytes()),
    )
    .unwrap();
    let all = unfiltered.throughput.iterations[0].total_hits;
    let half = filtered.throughput.iterations[0].total_hits;
    assert!(half > 0 && half < all, "{} of {}", half, all);

    let sorted = geobench::run(
        test_config().with_distance_sort(true),
        &mut Cursor::new(lines.as_bytes()),
    )
    .unwrap();
    assert_eq!(sorted.throughput.iterations[0].total_hits, all);
}

#[test]
fn test_nearest_query() {
    init_logging();
    let lines = as_lines(&london_points(500));
    let config = test_config().with_query(QueryKind::Nearest { top_n: 3 });
    let report = geobench::run(config, &mut Cursor::new(lines.as_bytes())).unwrap();

    let stats = &report.throughput.iterations[0];
    assert_eq!(stats.query_count, 225);
    assert_eq!(stats.total_hits, 225 * 3);
    assert!(stats.total_nearest_distance > 0.0);
}

#[test]
fn test_poly_file_workload() {
    init_logging();
    let points = london_points(2000);
    let synthesizer = PolygonSynthesizer::default();
    let center = GeoPoint::new(51.5, -0.1).unwrap();
    let query: MultiPolygonQuery = synthesizer.synthesize_polygon(center, 6_000.0, 8).unwrap().into();

    let mut file = NamedTempFile::new().unwrap();
    encode(&query, &mut file).unwrap();
    encode(&query, &mut file).unwrap();
    file.flush().unwrap();

    let config = test_config().with_query(QueryKind::PolyFile {
        path: file.path().to_path_buf(),
    });
    let report = geobench::run(config, &mut Cursor::new(as_lines(&points).into_bytes())).unwrap();

    let region = Region::polygons(&query);
    let expected = points
        .iter()
        .filter(|(_, lat, lon)| region.contains(&GeoPoint::new(*lat, *lon).unwrap()))
        .count() as u64;
    assert!(expected > 0);

    let stats = &report.throughput.iterations[0];
    assert_eq!(stats.query_count, 2);
    assert_eq!(stats.total_hits, 2 * expected);
}

#[test]
fn test_config_file_drives_binary_path() {
    init_logging();
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "encoding = \"postings\"\niterations = 1\n\n[query]\nkind = \"distance\"\n\n[ingest]\nworkers = 2\nbatch_size = 10"
    )
    .unwrap();
    file.flush().unwrap();

    let config = BenchConfig::load(file.path()).unwrap();
    assert_eq!(config.encoding, EncodingKind::Postings);
    assert_eq!(config.query, QueryKind::Distance);

    let runner = BenchRunner::new(config).unwrap();
    let report = runner
        .run(&mut Cursor::new(as_lines(&london_points(300)).into_bytes()))
        .unwrap();
    assert_eq!(report.throughput.iterations.len(), 1);
    assert_eq!(report.partitions[0].name, "osm0.postings.small");
}

#[test]
fn test_index_usable_directly() {
    let index = SegmentedIndex::new("direct", PointsEncoding);
    for (id, lat, lon) in london_points(100) {
        index
            .bulk_insert(Document::new(id, GeoPoint::new(lat, lon).unwrap()))
            .unwrap();
    }
    index.commit().unwrap();

    let predicate = index.build_box_predicate(&LONDON_BOUNDS).unwrap();
    assert_eq!(index.count_matching(&predicate).unwrap(), 100);
}
