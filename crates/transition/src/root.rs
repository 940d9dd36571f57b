use alloy_primitives::B256;
use alloy_rlp::Encodable;

/// Root of an ordered list of encoded items.
pub trait RootHasher {
    fn ordered_root(&self, items: &[Vec<u8>]) -> B256;
}

/// Merkle-Patricia root keyed by `rlp(index)`, as used for transaction and receipt roots.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrieRootHasher;

impl RootHasher for TrieRootHasher {
    fn ordered_root(&self, items: &[Vec<u8>]) -> B256 {
        alloy_trie::root::ordered_trie_root_with_encoder(items, |item, buf| {
            buf.extend_from_slice(item);
        })
    }
}

/// RLP-encode every item, keeping order.
pub fn encode_all<'a, T: Encodable + 'a>(items: impl IntoIterator<Item = &'a T>) -> Vec<Vec<u8>> {
    items.into_iter().map(alloy_rlp::encode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_has_empty_root() {
        assert_eq!(TrieRootHasher.ordered_root(&[]), alloy_trie::EMPTY_ROOT_HASH);
    }

    #[test]
    fn test_root_depends_on_order_only_through_items() {
        let items = encode_all(&[1_u64, 2, 3]);
        let first = TrieRootHasher.ordered_root(&items);
        assert_eq!(first, TrieRootHasher.ordered_root(&items));

        let reordered = encode_all(&[3_u64, 2, 1]);
        assert_ne!(first, TrieRootHasher.ordered_root(&reordered));
    }
}
