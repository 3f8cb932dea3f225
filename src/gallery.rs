use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;

use bincode::{Decode, Encode};
use rand::Rng;

use crate::error::Result;
use crate::node::Node;
use crate::persist::NodeRecord;

pub const DEFAULT_LIMIT: usize = 200;

#[derive(Encode, Decode)]
struct GalleryEntry {
    id: String,
    tree: NodeRecord,
}

/// The most recent trees, by id. The oldest entry goes once `limit` is exceeded.
pub struct Gallery {
    limit: usize,
    order: VecDeque<String>,
    arts: HashMap<String, Node>,
}

impl Gallery {
    pub fn new(limit: usize) -> Self {
        Gallery { limit: limit.max(1), order: VecDeque::new(), arts: HashMap::new() }
    }

    /// Store `tree` under a fresh random id and return the id.
    pub fn insert(&mut self, tree: Node) -> String {
        let id = new_id(&mut rand::thread_rng());
        self.insert_with_id(id.clone(), tree);
        id
    }

    pub fn insert_with_id(&mut self, id: String, tree: Node) {
        if self.arts.insert(id.clone(), tree).is_some() {
            self.order.retain(|existing| *existing != id);
        }
        self.order.push_back(id);

        while self.order.len() > self.limit {
            if let Some(oldest) = self.order.pop_front() {
                self.arts.remove(&oldest);
                log::debug!("gallery evicted {}", oldest);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.arts.get(id)
    }

    pub fn latest(&self) -> Option<(&str, &Node)> {
        let id = self.order.back()?;
        self.arts.get(id).map(|node| (id.as_str(), node))
    }

    /// Ids from oldest to newest.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let entries: Vec<GalleryEntry> = self
            .order
            .iter()
            .filter_map(|id| {
                self.arts.get(id).map(|node| GalleryEntry { id: id.clone(), tree: node.to_record() })
            })
            .collect();
        let cfg = bincode::config::standard();
        let encoded = bincode::encode_to_vec(&entries, cfg)?;
        fs::write(path, encoded)?;
        log::info!("saved {} trees to gallery", entries.len());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P, limit: usize) -> Result<Self> {
        let data = fs::read(path)?;
        let cfg = bincode::config::standard();
        let (entries, _len): (Vec<GalleryEntry>, usize) = bincode::decode_from_slice(&data, cfg)?;

        let mut gallery = Gallery::new(limit);
        for entry in entries {
            let tree = Node::from_record(&entry.tree)?;
            gallery.insert_with_id(entry.id, tree);
        }
        log::info!("loaded {} trees into gallery", gallery.len());
        Ok(gallery)
    }

    /// Pull every `*.json` tree found under `dir`. Files that fail to parse
    /// are logged and skipped. Returns the ids added.
    pub fn import_dir<P: AsRef<Path>>(&mut self, dir: P) -> Vec<String> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
            .map(|e| e.path().to_path_buf())
            .collect();
        paths.sort();

        let mut added = Vec::new();
        for path in paths {
            match Node::load_json(&path) {
                Ok(tree) => added.push(self.insert(tree)),
                Err(e) => log::warn!("skipping {}: {}", path.display(), e),
            }
        }
        added
    }
}

impl Default for Gallery {
    fn default() -> Self {
        Gallery::new(DEFAULT_LIMIT)
    }
}

/// 32 hex digits.
pub fn new_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:032x}", rng.r#gen::<u128>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::Generator;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn trees(n: usize) -> Vec<Node> {
        let mut generator = Generator::new(StdRng::seed_from_u64(21));
        (0..n).map(|_| generator.generate(6)).collect()
    }

    #[test]
    fn evicts_oldest_beyond_limit() {
        let mut gallery = Gallery::new(2);
        let ids: Vec<String> = trees(3).into_iter().map(|t| gallery.insert(t)).collect();
        assert_eq!(gallery.len(), 2);
        assert!(gallery.get(&ids[0]).is_none());
        assert!(gallery.get(&ids[2]).is_some());
        assert_eq!(gallery.latest().map(|(id, _)| id), Some(ids[2].as_str()));
    }

    #[test]
    fn reinserting_an_id_moves_it_to_the_back() {
        let mut gallery = Gallery::new(2);
        let mut ts = trees(3).into_iter();
        gallery.insert_with_id("a".into(), ts.next().unwrap());
        gallery.insert_with_id("b".into(), ts.next().unwrap());
        gallery.insert_with_id("a".into(), ts.next().unwrap());
        assert_eq!(gallery.ids().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn ids_are_hex() {
        let id = new_id(&mut StdRng::seed_from_u64(1));
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.bin");
        let mut gallery = Gallery::default();
        for t in trees(3) {
            gallery.insert(t);
        }
        gallery.save(&path).unwrap();

        let back = Gallery::load(&path, 10).unwrap();
        assert_eq!(back.ids().collect::<Vec<_>>(), gallery.ids().collect::<Vec<_>>());
        for id in gallery.ids() {
            assert_eq!(back.get(id), gallery.get(id));
        }
    }

    #[test]
    fn import_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let tree = trees(1).remove(0);
        tree.save_json(dir.path().join("good.json")).unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut gallery = Gallery::default();
        let added = gallery.import_dir(dir.path());
        assert_eq!(added.len(), 1);
        assert_eq!(gallery.get(&added[0]), Some(&tree));
    }
}
