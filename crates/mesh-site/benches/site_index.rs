//! Benchmarks for site index operations.

use std::fs;
use std::path::Path as FsPath;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mesh_path::Path;
use mesh_site::{Site, SiteSettings};
use mesh_storage::FsSource;

/// Create a site with `breadth` sections per level down to `depth`.
fn create_site(root: &FsPath, depth: usize, breadth: usize) {
    fn create_level(dir: &FsPath, current_depth: usize, max_depth: usize, breadth: usize) {
        if current_depth > max_depth {
            return;
        }

        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("index.html"),
            format!(
                "<html><head><title>Level {current_depth}</title></head>\
                 <body><p>Content at depth {current_depth}.</p></body></html>"
            ),
        )
        .unwrap();
        fs::write(
            dir.join("page.html"),
            "<html><head><title>Page</title></head><body>Leaf</body></html>",
        )
        .unwrap();

        for i in 0..breadth {
            let child_dir = dir.join(format!("section-{i}"));
            create_level(&child_dir, current_depth + 1, max_depth, breadth);
        }
    }

    create_level(root, 0, depth, breadth);
}

fn load_site(root: &FsPath) -> Site {
    let site = Site::new(
        Arc::new(FsSource::new(root.to_path_buf())),
        SiteSettings::default(),
    );
    site.rebuild_now();
    site
}

fn bench_index_lookup(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().join("site");
    create_site(&root, 3, 5);
    let index = load_site(&root).index();

    let hit = Path::new("section-0/section-1/page.html");
    let welcome = Path::new("section-0/section-1/index.html");
    let miss = Path::new("nonexistent/path.html");

    let mut group = c.benchmark_group("index_lookup");

    group.bench_function("get_hit", |b| b.iter(|| index.get(&hit)));
    group.bench_function("get_welcome", |b| b.iter(|| index.get(&welcome)));
    group.bench_function("get_miss", |b| b.iter(|| index.get(&miss)));

    group.finish();
}

fn bench_index_queries(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().join("site");
    create_site(&root, 4, 4);
    let index = load_site(&root).index();

    let section = Path::new("section-0/section-0");
    let deep = Path::new("section-0/section-0/section-0/section-0/page.html");

    let mut group = c.benchmark_group("index_queries");

    group.bench_function("children", |b| b.iter(|| index.children(&section)));
    group.bench_function("pages_under", |b| {
        b.iter(|| index.pages_under(&section).count())
    });
    group.bench_function("ranked_under", |b| b.iter(|| index.ranked_under(&section)));
    group.bench_function("breadcrumbs_deep", |b| b.iter(|| index.breadcrumbs(&deep)));

    group.finish();
}

fn bench_redirect_match(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path().join("site");
    create_site(&root, 4, 4);
    let site = load_site(&root);

    let mut group = c.benchmark_group("redirect_match");

    group.bench_function("first_lookup", |b| {
        b.iter_with_setup(
            || site.rebuild_now(),
            |index| index.redirect_match(&Path::new("section-1/section-2/moved.html")),
        );
    });

    let index = site.index();
    group.bench_function("memoized", |b| {
        b.iter(|| index.redirect_match(&Path::new("section-1/section-2/moved.html")))
    });

    group.finish();
}

fn bench_rebuild(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut group = c.benchmark_group("rebuild");

    // Small: ~26 pages, Medium: ~170 pages, Large: ~682 pages
    for (depth, breadth, label) in [(2, 3, "small"), (3, 4, "medium"), (4, 4, "large")] {
        let root = temp_dir.path().join(format!("site_{label}"));
        create_site(&root, depth, breadth);

        group.bench_with_input(BenchmarkId::new("cold", label), &root, |b, root| {
            b.iter_with_setup(
                || Site::new(Arc::new(FsSource::new(root.clone())), SiteSettings::default()),
                |site| site.rebuild_now(),
            );
        });

        let site = load_site(&root);
        group.bench_with_input(BenchmarkId::new("carry_forward", label), &site, |b, site| {
            b.iter(|| site.rebuild_now());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_index_lookup,
    bench_index_queries,
    bench_redirect_match,
    bench_rebuild,
);
criterion_main!(benches);
