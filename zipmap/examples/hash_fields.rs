use std::fs::File;

use zipmap::{AllocStats, MappedZipMap, StrU64Map, TrackedStore, TypedZipMap, ZipMap, ZipMapConfig};

fn main() -> zipmap::Result<()> {
    println!("=== ZipMap Demo ===\n");

    demo_layout()?;
    demo_slack()?;
    demo_typed()?;
    demo_persistence()?;
    Ok(())
}

fn demo_layout() -> zipmap::Result<()> {
    println!("1. Buffer layout:");
    let mut map = ZipMap::new();
    println!("   empty:  {}", map.repr()?);

    map.set(b"name", b"ferris")?;
    map.set(b"lang", b"rust")?;
    println!("   filled: {}", map.repr()?);
    println!("   {} entries in {} bytes: {map:?}", map.len()?, map.blob_len()?);
    println!();
    Ok(())
}

fn demo_slack() -> zipmap::Result<()> {
    println!("2. Slack reuse:");
    let stats = AllocStats::new();
    let mut map = ZipMap::new_in(TrackedStore::new(Vec::new(), stats.clone()))?;
    map.set(b"status", b"pending")?;

    for value in [b"ok".as_ref(), b"done", b"pending", b"x"] {
        map.set(b"status", value)?;
        println!(
            "   {:<10} -> {} ({} reallocations)",
            String::from_utf8_lossy(value),
            map.repr()?,
            stats.reallocations()
        );
    }
    println!();
    Ok(())
}

fn demo_typed() -> zipmap::Result<()> {
    println!("3. Typed counters:");
    let mut counters: StrU64Map = TypedZipMap::new();
    for page in ["home", "about", "home", "blog", "home"] {
        let hits = counters.get(page)?.unwrap_or(0);
        counters.insert(page, &(hits + 1))?;
    }
    for entry in counters.iter() {
        let (page, hits) = entry?;
        println!("   {page}: {hits}");
    }

    let config = ZipMapConfig::default().with_max_entries(2);
    println!("   exceeds max_entries=2: {}", counters.raw().exceeds(&config)?);
    println!();
    Ok(())
}

fn demo_persistence() -> zipmap::Result<()> {
    println!("4. Persistence:");
    let dir = std::env::temp_dir().join(format!("zipmap-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("fields.zm");

    let map = ZipMap::try_from_iter([("host", "localhost"), ("port", "6379")])?;
    let written = map.write_to(File::create(&path)?)?;
    println!("   wrote {written} bytes to {}", path.display());

    let mapped = MappedZipMap::open(&path)?;
    let view = mapped.view();
    println!(
        "   mapped port = {:?}",
        view.get(b"port")?.map(String::from_utf8_lossy)
    );

    std::fs::remove_dir_all(&dir)?;
    println!();
    Ok(())
}
