use crate::{hash_pair, TreeError, DEFAULT_HEIGHT, ZERO_HASHES};

use aggkit_db::{DatabaseConnectionProvider, TreeOperations, TreeTag};
use aggkit_primitives::TreeRoot;
use alloy_primitives::B256;

/// An append-only Merkle tree.
///
/// The i-th inserted leaf sits at position i. The frontier (the left sibling
/// at every height of the next insertion path) is cached in memory and
/// rebuilt from the last persisted root after a restart or a reorg.
#[derive(Debug)]
pub struct AppendTree {
    tag: TreeTag,
    leaf_count: u32,
    frontier: [B256; DEFAULT_HEIGHT],
}

impl AppendTree {
    /// Loads the tree state from the database: the leaf count from the last
    /// root, and the frontier by walking the insertion path of the next leaf.
    pub async fn load(
        db: &impl DatabaseConnectionProvider,
        tag: TreeTag,
    ) -> Result<Self, TreeError> {
        let mut tree =
            Self { tag, leaf_count: 0, frontier: [B256::ZERO; DEFAULT_HEIGHT] };
        tree.reload(db).await?;
        Ok(tree)
    }

    /// Rebuilds the in-memory frontier from the last persisted root. Must be
    /// called after a reorg removed roots.
    pub async fn reload(&mut self, db: &impl DatabaseConnectionProvider) -> Result<(), TreeError> {
        self.frontier = [B256::ZERO; DEFAULT_HEIGHT];
        let Some(last_root) = db.get_last_tree_root(self.tag).await? else {
            self.leaf_count = 0;
            return Ok(());
        };
        self.leaf_count = last_root.index + 1;
        self.init_frontier(db, last_root.hash).await
    }

    /// Walks down from `root` along the insertion path of leaf `leaf_count`,
    /// recording the left sibling wherever the path goes right.
    async fn init_frontier(
        &mut self,
        db: &impl DatabaseConnectionProvider,
        root: B256,
    ) -> Result<(), TreeError> {
        let index = self.leaf_count;
        let mut current = root;
        for height in (0..DEFAULT_HEIGHT).rev() {
            if current == ZERO_HASHES[height + 1] {
                break;
            }
            let (left, right) =
                db.get_tree_node(self.tag, current).await?.ok_or(TreeError::NotFound)?;
            if (index >> height) & 1 == 1 {
                self.frontier[height] = left;
                current = right;
            } else {
                current = left;
            }
        }
        Ok(())
    }

    /// The number of inserted leaves; also the position of the next leaf.
    pub const fn leaf_count(&self) -> u32 {
        self.leaf_count
    }

    /// Appends a leaf at the given index, which must equal the current leaf
    /// count, and persists the new nodes and versioned root.
    pub async fn add_leaf(
        &mut self,
        db: &impl DatabaseConnectionProvider,
        index: u32,
        leaf_hash: B256,
        block_num: u64,
        block_position: u64,
    ) -> Result<TreeRoot, TreeError> {
        if index != self.leaf_count {
            return Err(TreeError::InvalidLeafIndex { expected: self.leaf_count, got: index });
        }

        let mut current = leaf_hash;
        for height in 0..DEFAULT_HEIGHT {
            let (left, right) = if (index >> height) & 1 == 1 {
                (self.frontier[height], current)
            } else {
                self.frontier[height] = current;
                (current, ZERO_HASHES[height])
            };
            let parent = hash_pair(left, right);
            db.insert_tree_node(self.tag, parent, left, right).await?;
            current = parent;
        }

        let root = TreeRoot { hash: current, index, block_num, block_position };
        db.insert_tree_root(self.tag, root).await?;
        self.leaf_count = index + 1;

        tracing::trace!(target: "aggkit::tree", tree = %self.tag, index, root = ?root.hash, "appended leaf");
        Ok(root)
    }

    /// Returns the inclusion proof of the leaf at `leaf_index` against the
    /// historical root with the given hash.
    pub async fn get_proof(
        &self,
        db: &impl DatabaseConnectionProvider,
        leaf_index: u32,
        root: B256,
    ) -> Result<crate::Proof, TreeError> {
        get_proof_from_root(db, self.tag, leaf_index, root).await
    }

    /// Returns the historical root recorded after the leaf at `leaf_index`
    /// was inserted.
    pub async fn get_root_by_index(
        &self,
        db: &impl DatabaseConnectionProvider,
        leaf_index: u32,
    ) -> Result<TreeRoot, TreeError> {
        db.get_tree_root_by_index(self.tag, leaf_index).await?.ok_or(TreeError::NotFound)
    }

    /// Returns the root with the given hash.
    pub async fn get_root_by_hash(
        &self,
        db: &impl DatabaseConnectionProvider,
        hash: B256,
    ) -> Result<TreeRoot, TreeError> {
        db.get_tree_root_by_hash(self.tag, hash).await?.ok_or(TreeError::NotFound)
    }

    /// Returns the most recent root, or the empty root for an empty tree.
    pub async fn get_last_root(
        &self,
        db: &impl DatabaseConnectionProvider,
    ) -> Result<TreeRoot, TreeError> {
        Ok(db
            .get_last_tree_root(self.tag)
            .await?
            .unwrap_or(TreeRoot { hash: crate::empty_root(), ..Default::default() }))
    }

    /// Returns an in-memory snapshot of the frontier, for computing
    /// prospective roots without touching the database.
    pub fn snapshot(&self) -> FrontierSnapshot {
        FrontierSnapshot { leaf_count: self.leaf_count, frontier: self.frontier }
    }
}

/// An in-memory frontier of an append tree. Appending leaves and reading the
/// root never touches the database, so prospective roots ("what would the
/// root be after these exits") are cheap.
#[derive(Debug, Clone)]
pub struct FrontierSnapshot {
    leaf_count: u32,
    frontier: [B256; DEFAULT_HEIGHT],
}

impl FrontierSnapshot {
    /// The number of leaves in the snapshot.
    pub const fn leaf_count(&self) -> u32 {
        self.leaf_count
    }

    /// Appends a leaf at the given index, which must equal the current leaf
    /// count.
    pub fn append(&mut self, index: u32, leaf_hash: B256) -> Result<(), TreeError> {
        if index != self.leaf_count {
            return Err(TreeError::InvalidLeafIndex { expected: self.leaf_count, got: index });
        }
        let mut current = leaf_hash;
        for height in 0..DEFAULT_HEIGHT {
            if (index >> height) & 1 == 1 {
                current = hash_pair(self.frontier[height], current);
            } else {
                self.frontier[height] = current;
                current = hash_pair(current, ZERO_HASHES[height]);
            }
        }
        self.leaf_count = index + 1;
        Ok(())
    }

    /// The root of the snapshot.
    pub fn root(&self) -> B256 {
        let mut current = ZERO_HASHES[0];
        for height in 0..DEFAULT_HEIGHT {
            if (self.leaf_count >> height) & 1 == 1 {
                current = hash_pair(self.frontier[height], current);
            } else {
                current = hash_pair(current, ZERO_HASHES[height]);
            }
        }
        current
    }
}

/// Walks down from `root` to the leaf at `leaf_index`, collecting the sibling
/// at every level.
pub(crate) async fn get_proof_from_root(
    db: &impl DatabaseConnectionProvider,
    tag: TreeTag,
    leaf_index: u32,
    root: B256,
) -> Result<crate::Proof, TreeError> {
    let mut proof = [B256::ZERO; DEFAULT_HEIGHT];
    let mut current = root;
    for height in (0..DEFAULT_HEIGHT).rev() {
        if current == ZERO_HASHES[height + 1] {
            // the whole subtree is empty, the remaining siblings are the
            // zero-subtree roots.
            proof[..=height].copy_from_slice(&ZERO_HASHES[..=height]);
            break;
        }
        let (left, right) = db.get_tree_node(tag, current).await?.ok_or(TreeError::NotFound)?;
        if (leaf_index >> height) & 1 == 1 {
            proof[height] = left;
            current = right;
        } else {
            proof[height] = right;
            current = left;
        }
    }
    Ok(proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_root_from_proof;
    use aggkit_db::test_utils::setup_test_db;

    fn leaf(i: u8) -> B256 {
        B256::repeat_byte(i + 1)
    }

    #[tokio::test]
    async fn test_append_and_prove_every_leaf() {
        let db = setup_test_db().await;
        let mut tree = AppendTree::load(&db, TreeTag::L1Info).await.unwrap();

        let n = 9u8;
        for i in 0..n {
            tree.add_leaf(&db, i as u32, leaf(i), 100 + i as u64, 0).await.unwrap();
        }

        // every leaf verifies against every root that includes it.
        for root_index in 0..n {
            let root = tree.get_root_by_index(&db, root_index as u32).await.unwrap();
            for i in 0..=root_index {
                let proof = tree.get_proof(&db, i as u32, root.hash).await.unwrap();
                assert_eq!(
                    compute_root_from_proof(leaf(i), i as u32, &proof),
                    root.hash,
                    "leaf {i} against root {root_index}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_out_of_order_insert_is_rejected() {
        let db = setup_test_db().await;
        let mut tree = AppendTree::load(&db, TreeTag::L1Info).await.unwrap();

        tree.add_leaf(&db, 0, leaf(0), 1, 0).await.unwrap();
        let err = tree.add_leaf(&db, 2, leaf(2), 1, 1).await.unwrap_err();
        assert!(matches!(err, TreeError::InvalidLeafIndex { expected: 1, got: 2 }));
    }

    #[tokio::test]
    async fn test_frontier_reload_resumes_appends() {
        let db = setup_test_db().await;
        let mut tree = AppendTree::load(&db, TreeTag::L1Info).await.unwrap();
        for i in 0..5u8 {
            tree.add_leaf(&db, i as u32, leaf(i), i as u64, 0).await.unwrap();
        }
        let root_before = tree.get_last_root(&db).await.unwrap();

        // a fresh instance rebuilt from storage continues identically.
        let mut reloaded = AppendTree::load(&db, TreeTag::L1Info).await.unwrap();
        assert_eq!(reloaded.leaf_count(), 5);
        let continued = reloaded.add_leaf(&db, 5, leaf(5), 5, 0).await.unwrap();
        assert_ne!(continued.hash, root_before.hash);

        // every prior leaf still proves against the new root.
        for i in 0..6u8 {
            let proof = reloaded.get_proof(&db, i as u32, continued.hash).await.unwrap();
            assert_eq!(compute_root_from_proof(leaf(i), i as u32, &proof), continued.hash);
        }
    }

    #[tokio::test]
    async fn test_snapshot_root_tracks_persisted_roots() {
        let db = setup_test_db().await;
        let mut tree = AppendTree::load(&db, TreeTag::L1Info).await.unwrap();

        // empty snapshot has the empty root.
        assert_eq!(tree.snapshot().root(), crate::empty_root());

        for i in 0..4u8 {
            let persisted = tree.add_leaf(&db, i as u32, leaf(i), 1, i as u64).await.unwrap();
            assert_eq!(tree.snapshot().root(), persisted.hash);
        }

        // a prospective append matches what the tree would persist.
        let mut snapshot = tree.snapshot();
        snapshot.append(4, leaf(4)).unwrap();
        let persisted = tree.add_leaf(&db, 4, leaf(4), 2, 0).await.unwrap();
        assert_eq!(snapshot.root(), persisted.hash);
    }

    #[tokio::test]
    async fn test_reorg_rolls_back_the_root() {
        use aggkit_db::TreeOperations;

        let db = setup_test_db().await;
        let mut tree = AppendTree::load(&db, TreeTag::L1Info).await.unwrap();
        tree.add_leaf(&db, 0, leaf(0), 5, 0).await.unwrap();
        let root_at_block5 = tree.get_last_root(&db).await.unwrap();
        tree.add_leaf(&db, 1, leaf(1), 8, 0).await.unwrap();

        db.delete_tree_roots_gte_block(TreeTag::L1Info, 6).await.unwrap();
        tree.reload(&db).await.unwrap();

        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.get_last_root(&db).await.unwrap().hash, root_at_block5.hash);
    }
}
