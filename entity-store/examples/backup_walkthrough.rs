//! 保存、覆盖并删除一个实体，然后展示存储在磁盘上留下的内容。
//!
//! 运行：
//! ```bash
//! cargo run -p entity-store --example backup_walkthrough
//! ```

use entity_store::{FileEntityStore, StoreConfig};
use entity_store_macros::entity;
use std::path::Path;

#[entity(type_name = "Note")]
struct Note {
    text: String,
}

fn tree(root: &Path, depth: usize) -> std::io::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(root)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        println!("{}{}", "  ".repeat(depth), entry.file_name().to_string_lossy());
        if entry.file_type()?.is_dir() {
            tree(&entry.path(), depth + 1)?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = StoreConfig::builder()
        .dir(tmp.path().join("data"))
        .backup_dir(tmp.path().join("backup"))
        .version(1)
        .build();
    let store = FileEntityStore::open(config);

    println!("1. load: {} notes", store.load::<Note>("notes")?);

    let note = store.save(Note {
        id: "n1".into(),
        text: "draft".into(),
    })?;
    println!("2. saved {:?}", note);

    let note = store.save(Note {
        text: "final".into(),
        ..(*note).clone()
    })?;
    println!("3. overwrote, now {:?}", note);

    store.delete(note.as_ref())?;
    println!("4. deleted, still indexed: {}", store.get_by_id("n1").is_some());

    println!("\n{}", tmp.path().display());
    tree(tmp.path(), 1)?;
    Ok(())
}
