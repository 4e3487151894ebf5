use sea_orm_migration::{prelude::*, schema::*};

const HASH_LENGTH: u32 = 32;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TreeNode::Table)
                    .if_not_exists()
                    .col(string(TreeNode::Tree))
                    .col(binary_len(TreeNode::Hash, HASH_LENGTH))
                    .col(binary_len(TreeNode::Left, HASH_LENGTH))
                    .col(binary_len(TreeNode::Right, HASH_LENGTH))
                    .primary_key(Index::create().col(TreeNode::Tree).col(TreeNode::Hash))
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(TreeRoot::Table)
                    .if_not_exists()
                    .col(string(TreeRoot::Tree))
                    .col(big_integer(TreeRoot::LeafIndex))
                    .col(binary_len(TreeRoot::Hash, HASH_LENGTH))
                    .col(big_integer(TreeRoot::BlockNum))
                    .col(big_integer(TreeRoot::BlockPosition))
                    .primary_key(Index::create().col(TreeRoot::Tree).col(TreeRoot::LeafIndex))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_tree_root_hash")
                    .table(TreeRoot::Table)
                    .col(TreeRoot::Tree)
                    .col(TreeRoot::Hash)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(TreeNode::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(TreeRoot::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum TreeNode {
    Table,
    Tree,
    Hash,
    Left,
    Right,
}

#[derive(DeriveIden)]
enum TreeRoot {
    Table,
    Tree,
    LeafIndex,
    Hash,
    BlockNum,
    BlockPosition,
}
