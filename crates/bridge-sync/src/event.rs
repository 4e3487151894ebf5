use aggkit_primitives::{Bridge, Claim, LegacyTokenMigration, TokenMapping};

/// The typed union of the events a bridge syncer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An asset or message left this network.
    Bridge(Bridge),
    /// An exit originating on another network was claimed here.
    Claim(Claim),
    /// A wrapped token was deployed for a foreign token.
    TokenMapping(TokenMapping),
    /// A holder migrated legacy wrapped tokens to the updated token.
    LegacyTokenMigration(LegacyTokenMigration),
}
