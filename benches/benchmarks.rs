//! Performance benchmarks for Cova.
//!
//! This module contains benchmarks for:
//! - Descriptor (config.xml) parsing and queries
//! - Manifest (package.json) parsing
//! - Specifier classification
//! - Fetch ledger loading
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cova::core::{install_source, Specifier};
use cova::project::{FetchLedger, ManifestDoc, ProjectDescriptor};

// ============================================================================
// Mock Data Fixtures
// ============================================================================

mod fixtures {
    /// Generate a realistic config.xml with two engines and `num_plugins`
    /// plugin declarations, each carrying one variable.
    pub fn generate_config_xml(num_plugins: usize) -> String {
        let mut plugins = Vec::with_capacity(num_plugins);
        for i in 0..num_plugins {
            plugins.push(format!(
                "    <plugin name=\"cordova-plugin-bench-{i}\" spec=\"^{}.0.0\">\n        \
                 <variable name=\"KEY_{i}\" value=\"value-{i}\" />\n    </plugin>",
                i % 9 + 1
            ));
        }

        format!(
            r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="com.example.bench" version="1.0.0" xmlns="http://www.w3.org/ns/widgets">
    <name>Bench</name>
    <description>A benchmark project</description>
    <engine name="android" spec="^13.0.0" />
    <engine name="ios" spec="^7.0.0" />
{}
</widget>
"#,
            plugins.join("\n")
        )
    }

    /// Generate a realistic package.json with a cordova section.
    pub fn generate_package_json(num_plugins: usize) -> String {
        let mut entries = Vec::with_capacity(num_plugins);
        for i in 0..num_plugins {
            entries.push(format!(
                r#"      "cordova-plugin-bench-{i}": {{ "KEY_{i}": "value-{i}" }}"#
            ));
        }

        format!(
            r#"{{
  "name": "bench",
  "version": "1.0.0",
  "displayName": "Bench",
  "cordova": {{
    "platforms": ["android", "ios"],
    "plugins": {{
{}
    }}
  }},
  "devDependencies": {{
    "cordova-android": "^13.0.0",
    "cordova-ios": "^7.0.0"
  }}
}}
"#,
            entries.join(",\n")
        )
    }

    /// Generate a plugins/fetch.json with `num_entries` entries.
    pub fn generate_fetch_json(num_entries: usize) -> String {
        let mut entries = Vec::with_capacity(num_entries);
        for i in 0..num_entries {
            entries.push(format!(
                r#"  "cordova-plugin-bench-{i}": {{ "source": "cordova-plugin-bench-{i}@^1.0.0", "is_top_level": true, "variables": {{}} }}"#
            ));
        }
        format!("{{\n{}\n}}\n", entries.join(",\n"))
    }

    /// Specifier strings of every flavor for classification benchmarks.
    pub fn specifier_samples() -> Vec<Option<&'static str>> {
        vec![
            None,                                                  // Absent
            Some(""),                                              // Blank
            Some("^7.0.0"),                                        // Caret range
            Some("~1.2"),                                          // Tilde range
            Some("1.x"),                                           // Wildcard range
            Some(">=2.0.0, <3.0.0"),                               // Compound range
            Some("7.0.0"),                                         // Bare version
            Some("*"),                                             // Any
            Some("https://github.com/apache/cordova-ios.git#7.0"), // Git URL
            Some("file:../local/cordova-plugin-thing"),            // Local path
            Some("nightly"),                                       // Dist-tag
        ]
    }
}

// ============================================================================
// Parsing Benchmarks
// ============================================================================

fn bench_descriptor_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing/config_xml");

    for num_plugins in [5, 20, 50, 100].iter() {
        let xml = fixtures::generate_config_xml(*num_plugins);

        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", num_plugins), &xml, |b, xml| {
            b.iter(|| {
                let descriptor = ProjectDescriptor::from_str_at("config.xml", black_box(xml));
                black_box(descriptor)
            });
        });
    }

    group.finish();
}

fn bench_manifest_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing/package_json");

    for num_plugins in [5, 20, 50, 100].iter() {
        let json = fixtures::generate_package_json(*num_plugins);

        group.throughput(Throughput::Bytes(json.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", num_plugins), &json, |b, json| {
            b.iter(|| {
                let doc: ManifestDoc = serde_json::from_str(black_box(json)).unwrap();
                black_box(doc)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Specifier Benchmarks
// ============================================================================

fn bench_specifier_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("specifier");

    let samples = fixtures::specifier_samples();

    group.bench_function("classify", |b| {
        b.iter(|| {
            for sample in &samples {
                let _ = black_box(Specifier::classify(black_box(*sample)));
            }
        });
    });

    group.bench_function("install_source", |b| {
        b.iter(|| {
            for sample in &samples {
                let _ = black_box(install_source(black_box("cordova-ios"), *sample));
            }
        });
    });

    group.finish();
}

// ============================================================================
// Descriptor Query Benchmarks
// ============================================================================

fn bench_descriptor_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("descriptor");

    for num_plugins in [20, 100].iter() {
        let xml = fixtures::generate_config_xml(*num_plugins);
        let descriptor = ProjectDescriptor::from_str_at("config.xml", &xml).unwrap();

        group.throughput(Throughput::Elements(*num_plugins as u64));
        group.bench_with_input(
            BenchmarkId::new("plugins", num_plugins),
            &descriptor,
            |b, descriptor| {
                b.iter(|| {
                    let plugins = descriptor.plugins();
                    black_box(plugins)
                });
            },
        );

        let last = format!("cordova-plugin-bench-{}", num_plugins - 1);
        group.bench_with_input(
            BenchmarkId::new("plugin_lookup", num_plugins),
            &descriptor,
            |b, descriptor| {
                b.iter(|| {
                    let decl = descriptor.plugin(black_box(&last));
                    black_box(decl)
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Ledger Benchmarks
// ============================================================================

fn bench_ledger_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger");

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    for num_entries in [10, 100, 500].iter() {
        let root = temp_dir.path().join(format!("project_{}", num_entries));
        std::fs::create_dir_all(root.join("plugins")).expect("Failed to create plugins dir");
        std::fs::write(
            root.join("plugins").join("fetch.json"),
            fixtures::generate_fetch_json(*num_entries),
        )
        .expect("Failed to write fetch.json");

        group.throughput(Throughput::Elements(*num_entries as u64));
        group.bench_with_input(BenchmarkId::new("load", num_entries), &root, |b, root| {
            b.iter(|| {
                let ledger = FetchLedger::load(black_box(root)).unwrap();
                black_box(ledger)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Groups and Main
// ============================================================================

criterion_group!(parsing_benches, bench_descriptor_parsing, bench_manifest_parsing,);

criterion_group!(core_benches, bench_specifier_classification, bench_descriptor_queries,);

criterion_group!(store_benches, bench_ledger_load,);

criterion_main!(parsing_benches, core_benches, store_benches,);
