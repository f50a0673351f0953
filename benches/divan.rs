use std::fs;

use divan::AllocProfiler;
use game_launcher::{
    cache::CacheStore, data::SortOrder, metadata::MetadataStore, registry::Registry,
    scanner::Scanner,
};

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

// Basic benchmark for getting a rough idea of overall speed and memory usage
#[divan::bench(sample_size = 100)]
fn bench_all(bencher: divan::Bencher) {
    let dir = tempfile::tempdir().unwrap();
    let games = dir.path().join("games");
    for i in 0..50 {
        let game = games.join(format!("Game {i:02}"));
        fs::create_dir_all(&game).unwrap();
        fs::write(game.join(format!("Game {i:02}.exe")), vec![0; 256]).unwrap();
        fs::write(game.join("crashreporter.exe"), vec![0; 256]).unwrap();
    }

    bencher.bench_local(|| {
        let mut registry = Registry::new(
            vec![games.clone()],
            Scanner::new(),
            CacheStore::new(dir.path().join("cache.json")),
            MetadataStore::open(dir.path().join("history.json")),
        );
        registry.rescan(true);
        for order in SortOrder::ALL {
            divan::black_box(registry.sorted_view(order).len());
        }
    });
}
