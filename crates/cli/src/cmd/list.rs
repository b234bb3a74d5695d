//! Print the bookmark tree

use crate::util::App;
use anyhow::Result;
use marksync_core::{RootKind, Store};
use owo_colors::OwoColorize;
use uuid::Uuid;

pub async fn run() -> Result<()> {
    let app = App::load()?;
    let handle = app.open_store()?;
    let store = handle.lock();

    for root in RootKind::ALL {
        let id = store.root_id(root);
        println!("{}", root.title().bold());
        if store.children(id).is_empty() {
            println!("  {}", "(empty)".dimmed());
        }
        print_level(&store, id, 1);
        println!();
    }

    println!(
        "{}",
        format!("{} bookmarks, {} folders", store.url_count(), store.len() - store.url_count()).dimmed()
    );
    Ok(())
}

fn print_level(store: &Store, folder: Uuid, depth: usize) {
    let indent = "  ".repeat(depth);
    for node in store.child_nodes(folder) {
        if node.is_folder() {
            println!("{}{}", indent, format!("{}/", node.title).yellow());
            print_level(store, node.id, depth + 1);
        } else {
            println!("{}{}  {}", indent, node.title, node.url.dimmed());
        }
    }
}
