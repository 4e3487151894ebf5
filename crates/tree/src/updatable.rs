use crate::{append::get_proof_from_root, hash_pair, TreeError, DEFAULT_HEIGHT, ZERO_HASHES};

use aggkit_db::{DatabaseConnectionProvider, TreeOperations, TreeTag};
use aggkit_primitives::TreeRoot;
use alloy_primitives::B256;

/// A Merkle tree whose leaves can be overwritten in place. Used for the
/// rollup exit tree, where the leaf at position `rollup_id - 1` is the latest
/// local exit root of that rollup.
///
/// Roots are versioned by update count, so historical leaf values can be
/// resolved against any persisted root by bit-path traversal.
#[derive(Debug)]
pub struct UpdatableTree {
    tag: TreeTag,
    current_root: B256,
    update_count: u32,
}

impl UpdatableTree {
    /// Loads the tree state from the database.
    pub async fn load(
        db: &impl DatabaseConnectionProvider,
        tag: TreeTag,
    ) -> Result<Self, TreeError> {
        let mut tree = Self { tag, current_root: crate::empty_root(), update_count: 0 };
        tree.reload(db).await?;
        Ok(tree)
    }

    /// Re-reads the last persisted root. Must be called after a reorg
    /// removed roots.
    pub async fn reload(&mut self, db: &impl DatabaseConnectionProvider) -> Result<(), TreeError> {
        match db.get_last_tree_root(self.tag).await? {
            Some(root) => {
                self.current_root = root.hash;
                self.update_count = root.index + 1;
            }
            None => {
                self.current_root = crate::empty_root();
                self.update_count = 0;
            }
        }
        Ok(())
    }

    /// The current root of the tree.
    pub const fn current_root(&self) -> B256 {
        self.current_root
    }

    /// Overwrites the leaf at `position` and persists the new nodes and
    /// versioned root.
    pub async fn upsert_leaf(
        &mut self,
        db: &impl DatabaseConnectionProvider,
        position: u32,
        leaf_hash: B256,
        block_num: u64,
        block_position: u64,
    ) -> Result<TreeRoot, TreeError> {
        // collect the siblings along the path from the current root.
        let siblings = self.path_siblings(db, position).await?;

        // recompute the path bottom-up with the new leaf.
        let mut current = leaf_hash;
        for height in 0..DEFAULT_HEIGHT {
            let (left, right) = if (position >> height) & 1 == 1 {
                (siblings[height], current)
            } else {
                (current, siblings[height])
            };
            let parent = hash_pair(left, right);
            db.insert_tree_node(self.tag, parent, left, right).await?;
            current = parent;
        }

        let root = TreeRoot {
            hash: current,
            index: self.update_count,
            block_num,
            block_position,
        };
        db.insert_tree_root(self.tag, root).await?;
        self.current_root = current;
        self.update_count += 1;

        tracing::trace!(target: "aggkit::tree", tree = %self.tag, position, root = ?root.hash, "updated leaf");
        Ok(root)
    }

    /// Returns the siblings along the path from the current root down to
    /// `position`, substituting zero-subtree roots inside empty regions.
    async fn path_siblings(
        &self,
        db: &impl DatabaseConnectionProvider,
        position: u32,
    ) -> Result<crate::Proof, TreeError> {
        let mut siblings = [B256::ZERO; DEFAULT_HEIGHT];
        let mut current = self.current_root;
        for height in (0..DEFAULT_HEIGHT).rev() {
            if current == ZERO_HASHES[height + 1] {
                siblings[..=height].copy_from_slice(&ZERO_HASHES[..=height]);
                break;
            }
            let (left, right) =
                db.get_tree_node(self.tag, current).await?.ok_or(TreeError::NotFound)?;
            if (position >> height) & 1 == 1 {
                siblings[height] = left;
                current = right;
            } else {
                siblings[height] = right;
                current = left;
            }
        }
        Ok(siblings)
    }

    /// Returns the inclusion proof of the leaf at `position` against a
    /// historical root.
    pub async fn get_proof(
        &self,
        db: &impl DatabaseConnectionProvider,
        position: u32,
        root: B256,
    ) -> Result<crate::Proof, TreeError> {
        get_proof_from_root(db, self.tag, position, root).await
    }

    /// Resolves the leaf at `position` under a historical root.
    pub async fn get_leaf(
        &self,
        db: &impl DatabaseConnectionProvider,
        position: u32,
        root: B256,
    ) -> Result<B256, TreeError> {
        let mut current = root;
        for height in (0..DEFAULT_HEIGHT).rev() {
            if current == ZERO_HASHES[height + 1] {
                return Ok(B256::ZERO);
            }
            let (left, right) =
                db.get_tree_node(self.tag, current).await?.ok_or(TreeError::NotFound)?;
            current = if (position >> height) & 1 == 1 { right } else { left };
        }
        Ok(current)
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_root_from_proof;
    use aggkit_db::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_upsert_and_resolve_across_roots() {
        let db = setup_test_db().await;
        let mut tree = UpdatableTree::load(&db, TreeTag::RollupExit).await.unwrap();

        let first = tree.upsert_leaf(&db, 0, B256::repeat_byte(1), 1, 0).await.unwrap();
        let second = tree.upsert_leaf(&db, 3, B256::repeat_byte(2), 2, 0).await.unwrap();
        let third = tree.upsert_leaf(&db, 0, B256::repeat_byte(3), 3, 0).await.unwrap();

        // historical leaf values resolve against their roots.
        assert_eq!(tree.get_leaf(&db, 0, first.hash).await.unwrap(), B256::repeat_byte(1));
        assert_eq!(tree.get_leaf(&db, 0, second.hash).await.unwrap(), B256::repeat_byte(1));
        assert_eq!(tree.get_leaf(&db, 0, third.hash).await.unwrap(), B256::repeat_byte(3));
        assert_eq!(tree.get_leaf(&db, 3, third.hash).await.unwrap(), B256::repeat_byte(2));
        assert_eq!(tree.get_leaf(&db, 7, third.hash).await.unwrap(), B256::ZERO);
    }

    #[tokio::test]
    async fn test_proof_against_updated_tree() {
        let db = setup_test_db().await;
        let mut tree = UpdatableTree::load(&db, TreeTag::RollupExit).await.unwrap();

        tree.upsert_leaf(&db, 1, B256::repeat_byte(7), 1, 0).await.unwrap();
        let root = tree.upsert_leaf(&db, 5, B256::repeat_byte(9), 2, 0).await.unwrap();

        let proof = tree.get_proof(&db, 5, root.hash).await.unwrap();
        assert_eq!(compute_root_from_proof(B256::repeat_byte(9), 5, &proof), root.hash);

        let proof = tree.get_proof(&db, 1, root.hash).await.unwrap();
        assert_eq!(compute_root_from_proof(B256::repeat_byte(7), 1, &proof), root.hash);
    }

    #[tokio::test]
    async fn test_empty_tree_has_canonical_root() {
        let db = setup_test_db().await;
        let tree = UpdatableTree::load(&db, TreeTag::RollupExit).await.unwrap();
        assert_eq!(tree.current_root(), crate::empty_root());
        assert_eq!(tree.get_last_root(&db).await.unwrap().hash, crate::empty_root());
    }
}
