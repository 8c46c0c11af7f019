//! Address identities.
//!
//! Every distinct non-sequence address pair in a package gets one fresh
//! identity. Identities are minted per build and are not derived from the
//! pair, so two builds of the same source disagree on them.

use rustc_hash::FxHashMap;
use stela_types::Type;
use uuid::{Context, Timestamp, Uuid};

use crate::collect::AddressPair;
use crate::CodegenError;

/// Where identities come from.
pub trait IdentitySource {
    fn next_id(&mut self) -> Uuid;
}

/// Time-based (version 1) identities.
///
/// The node id is random per source, with the multicast bit set as RFC 4122
/// asks for node ids that are not a hardware address.
pub struct TimeIdentities {
    context: Context,
    node: [u8; 6],
}

impl TimeIdentities {
    pub fn new() -> Self {
        let seed = Uuid::new_v4();
        let bytes = seed.as_bytes();
        let mut node = [0u8; 6];
        node.copy_from_slice(&bytes[..6]);
        node[0] |= 0x01;
        TimeIdentities {
            context: Context::new(u16::from_be_bytes([bytes[6], bytes[7]])),
            node,
        }
    }
}

impl Default for TimeIdentities {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentitySource for TimeIdentities {
    fn next_id(&mut self) -> Uuid {
        Uuid::new_v1(Timestamp::now(&self.context), &self.node)
    }
}

/// Bijection between address identities and address pairs.
#[derive(Debug, Default)]
pub struct AddressMap {
    entries: Vec<(Uuid, AddressPair)>,
    by_pair: FxHashMap<AddressPair, usize>,
    by_id: FxHashMap<Uuid, usize>,
}

impl AddressMap {
    /// Mint one identity per distinct pair. Sequence pairs are skipped.
    ///
    /// A pair seen twice or an identity minted twice is an internal error.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn assign<'a, I>(pairs: I, ids: &mut dyn IdentitySource) -> Result<Self, CodegenError>
    where
        I: IntoIterator<Item = &'a AddressPair>,
    {
        let mut map = AddressMap::default();
        for pair in pairs {
            if pair.is_sequence() {
                tracing::trace!(from = %pair.from, to = %pair.to, "skipping sequence address");
                continue;
            }
            let id = ids.next_id();
            let index = map.entries.len();
            if map.by_pair.insert(pair.clone(), index).is_some() {
                return Err(CodegenError::invariant(format!(
                    "address `{}` -> `{}` assigned twice",
                    pair.from, pair.to
                )));
            }
            if map.by_id.insert(id, index).is_some() {
                return Err(CodegenError::invariant(format!(
                    "address identity {id} minted twice"
                )));
            }
            map.entries.push((id, pair.clone()));
        }
        tracing::debug!(identities = map.entries.len(), "assigned address identities");
        Ok(map)
    }

    /// Identity of the address from `from` to `to`, if one was assigned.
    pub fn id_for(&self, from: &Type, to: &Type) -> Option<Uuid> {
        let pair = AddressPair::new(from, to);
        self.by_pair.get(&pair).map(|&index| self.entries[index].0)
    }

    pub fn pair_for(&self, id: Uuid) -> Option<&AddressPair> {
        self.by_id.get(&id).map(|&index| &self.entries[index].1)
    }

    /// Entries in assignment order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Uuid, &AddressPair)> {
        self.entries.iter().map(|(id, pair)| (*id, pair))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// C++ variable holding an identity at run time.
pub fn cpp_index_name(id: Uuid) -> String {
    format!("Index_{}", id.hyphenated().to_string().replace('-', "_"))
}
