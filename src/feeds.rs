//! Listing page presets.

use crate::decode::ItemDecoder;
use crate::state::{Counter, FeedOrder, FeedSettings, PaginationMode};
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedProfile {
    pub name: &'static str,
    /// Listing path; `{address}` is replaced by the page's address.
    pub listing_path: &'static str,
    /// Channel topic; `{address}` is replaced by the page's address.
    pub topic: &'static str,
    pub events: &'static [&'static str],
    pub settings: FeedSettings,
    /// Live messages go through the batcher; otherwise one `RECEIVED_ITEM` each.
    pub batched: bool,
    /// Items are admitted through the address filter.
    pub filtered: bool,
    pub pagination: PaginationMode,
    pub decoder: ItemDecoder,
}

const BLOCK_DECODER: ItemDecoder = ItemDecoder {
    html_field: "block_html",
    key_attr: "data-block-number",
    key_field: None,
    rank_attr: Some("data-block-number"),
    rank_field: Some("block_number"),
};

const TRANSACTION_DECODER: ItemDecoder = ItemDecoder {
    html_field: "transaction_html",
    key_attr: "data-identifier-hash",
    key_field: Some("transaction_hash"),
    rank_attr: None,
    rank_field: None,
};

pub const PROFILE_NAMES: &[&str] = &[
    "blocks",
    "chain-blocks",
    "transactions",
    "address-transactions",
    "internal-transactions",
    "token-transfers",
    "validations",
];

impl FeedProfile {
    pub fn blocks() -> Self {
        Self {
            name: "blocks",
            listing_path: "/blocks",
            topic: "blocks:new_block",
            events: &["new_block"],
            settings: FeedSettings {
                order: FeedOrder::Ranked,
                window: 50,
                batch_threshold: None,
                counter: Counter::Items,
            },
            batched: false,
            filtered: false,
            pagination: PaginationMode::Cursor,
            decoder: BLOCK_DECODER,
        }
    }

    /// Home page block strip.
    pub fn chain_blocks() -> Self {
        Self {
            name: "chain-blocks",
            listing_path: "/chain-blocks",
            settings: FeedSettings {
                window: 4,
                ..Self::blocks().settings
            },
            decoder: ItemDecoder {
                html_field: "chain_block_html",
                ..BLOCK_DECODER
            },
            ..Self::blocks()
        }
    }

    pub fn transactions() -> Self {
        Self {
            name: "transactions",
            listing_path: "/txs",
            topic: "transactions:new_transaction",
            events: &["transaction"],
            settings: FeedSettings {
                order: FeedOrder::Stream,
                window: 50,
                batch_threshold: Some(10),
                counter: Counter::Items,
            },
            batched: true,
            filtered: false,
            pagination: PaginationMode::Cursor,
            decoder: TRANSACTION_DECODER,
        }
    }

    pub fn address_transactions() -> Self {
        Self {
            name: "address-transactions",
            listing_path: "/address/{address}/transactions",
            topic: "addresses_old:{address}",
            events: &["transaction", "pending_transaction"],
            settings: FeedSettings {
                batch_threshold: Some(6),
                ..Self::transactions().settings
            },
            filtered: true,
            ..Self::transactions()
        }
    }

    pub fn internal_transactions() -> Self {
        Self {
            name: "internal-transactions",
            listing_path: "/address/{address}/internal-transactions",
            topic: "addresses:{address}",
            events: &["internal_transaction"],
            filtered: true,
            decoder: ItemDecoder {
                html_field: "internal_transaction_html",
                key_attr: "data-key",
                key_field: None,
                rank_attr: None,
                rank_field: None,
            },
            ..Self::transactions()
        }
    }

    pub fn token_transfers() -> Self {
        Self {
            name: "token-transfers",
            listing_path: "/address/{address}/token-transfers",
            topic: "addresses:{address}",
            events: &["token_transfer"],
            settings: FeedSettings {
                batch_threshold: None,
                ..Self::transactions().settings
            },
            batched: false,
            filtered: true,
            decoder: ItemDecoder {
                html_field: "token_transfer_html",
                key_field: None,
                ..TRANSACTION_DECODER
            },
            ..Self::transactions()
        }
    }

    /// Blocks validated by an address, newest first as they arrive.
    pub fn validations() -> Self {
        Self {
            name: "validations",
            listing_path: "/address/{address}/validations",
            topic: "blocks:{address}",
            events: &["new_block"],
            settings: FeedSettings {
                order: FeedOrder::Stream,
                window: 50,
                batch_threshold: None,
                counter: Counter::Validations,
            },
            batched: false,
            filtered: false,
            pagination: PaginationMode::Cursor,
            decoder: ItemDecoder {
                rank_attr: None,
                rank_field: None,
                ..BLOCK_DECODER
            },
        }
    }

    pub fn needs_address(&self) -> bool {
        self.topic.contains("{address}") || self.listing_path.contains("{address}")
    }

    pub fn topic_for(&self, address: Option<&str>) -> String {
        fill(self.topic, address)
    }

    pub fn listing_path_for(&self, address: Option<&str>) -> String {
        fill(self.listing_path, address)
    }
}

fn fill(template: &str, address: Option<&str>) -> String {
    match address {
        Some(address) => template.replace("{address}", address),
        None => template.to_string(),
    }
}

impl FromStr for FeedProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blocks" => Ok(Self::blocks()),
            "chain-blocks" | "chain" => Ok(Self::chain_blocks()),
            "transactions" | "txs" => Ok(Self::transactions()),
            "address-transactions" => Ok(Self::address_transactions()),
            "internal-transactions" => Ok(Self::internal_transactions()),
            "token-transfers" => Ok(Self::token_transfers()),
            "validations" => Ok(Self::validations()),
            other => Err(format!(
                "unknown feed `{other}` (expected one of: {})",
                PROFILE_NAMES.join(", ")
            )),
        }
    }
}
