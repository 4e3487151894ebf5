//! Database migrations for the per-syncer databases.
#![allow(elided_lifetimes_in_paths)]

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_sync_tables;
mod m20240101_000002_create_tree_tables;
mod m20240101_000003_create_l1info_tables;
mod m20240101_000004_create_bridge_tables;
mod m20240101_000005_create_aggsender_tables;

/// The migrator for the L1 info tree syncer database.
#[derive(Debug)]
pub struct L1InfoTreeMigrator;

#[async_trait::async_trait]
impl MigratorTrait for L1InfoTreeMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_sync_tables::Migration),
            Box::new(m20240101_000002_create_tree_tables::Migration),
            Box::new(m20240101_000003_create_l1info_tables::Migration),
        ]
    }
}

/// The migrator for a bridge syncer database.
#[derive(Debug)]
pub struct BridgeMigrator;

#[async_trait::async_trait]
impl MigratorTrait for BridgeMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_sync_tables::Migration),
            Box::new(m20240101_000002_create_tree_tables::Migration),
            Box::new(m20240101_000004_create_bridge_tables::Migration),
        ]
    }
}

/// The migrator for the aggsender database.
#[derive(Debug)]
pub struct AggsenderMigrator;

#[async_trait::async_trait]
impl MigratorTrait for AggsenderMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_000005_create_aggsender_tables::Migration)]
    }
}

/// A migrator applying every table, used by the test databases.
#[derive(Debug)]
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_sync_tables::Migration),
            Box::new(m20240101_000002_create_tree_tables::Migration),
            Box::new(m20240101_000003_create_l1info_tables::Migration),
            Box::new(m20240101_000004_create_bridge_tables::Migration),
            Box::new(m20240101_000005_create_aggsender_tables::Migration),
        ]
    }
}
