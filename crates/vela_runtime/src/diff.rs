//! Keyed child list reconciliation
//!
//! Reconciles two ordered child lists in five steps:
//!
//! 1. Patch matching nodes from the front, then from the back, shrinking the
//!    window of unmatched nodes
//! 2. If only new nodes remain, mount them; if only old nodes remain, unmount them
//! 3. Otherwise match old nodes to new slots by key (or by type for keyless
//!    nodes), unmount the unmatched, and record new-slot -> old-index
//! 4. If matched old indices are out of order, compute their longest
//!    increasing subsequence: those nodes stay put
//! 5. Walk the window back to front, mounting fresh slots and moving matched
//!    nodes outside the subsequence
//!
//! Moves are minimal: reordering `[a, b, c, d]` into `[a, c, b, d]` moves one node.

use rustc_hash::FxHashMap;

use crate::host::HostNode;
use crate::key::Key;
use crate::renderer::Renderer;
use crate::vnode::{is_same_vnode_type, VNode};

impl Renderer {
    pub(crate) fn patch_keyed_children(
        &self,
        c1: &[VNode],
        c2: &[VNode],
        container: HostNode,
        parent_anchor: Option<HostNode>,
    ) {
        let l2 = c2.len();
        let mut i = 0usize;
        // Inclusive ends; -1 means empty
        let mut e1 = c1.len() as isize - 1;
        let mut e2 = l2 as isize - 1;

        // 1. Sync from the front
        while (i as isize) <= e1 && (i as isize) <= e2 {
            let (n1, n2) = (&c1[i], &c2[i]);
            if !is_same_vnode_type(n1, n2) {
                break;
            }
            self.patch(Some(n1), n2, container, None);
            i += 1;
        }

        // ... and from the back
        while (i as isize) <= e1 && (i as isize) <= e2 {
            let (n1, n2) = (&c1[e1 as usize], &c2[e2 as usize]);
            if !is_same_vnode_type(n1, n2) {
                break;
            }
            self.patch(Some(n1), n2, container, None);
            e1 -= 1;
            e2 -= 1;
        }

        let start = i as isize;

        // 2. Only additions remain
        if start > e1 {
            if start <= e2 {
                let next_pos = (e2 + 1) as usize;
                let anchor = if next_pos < l2 {
                    self.first_host_node(&c2[next_pos])
                } else {
                    parent_anchor
                };
                for child in &c2[i..=e2 as usize] {
                    self.patch(None, child, container, anchor);
                }
            }
            return;
        }

        // ... or only removals
        if start > e2 {
            for child in &c1[i..=e1 as usize] {
                self.unmount(child);
            }
            return;
        }

        // 3. Unknown sequence in the middle
        let (s1, s2) = (i, i);
        let (e1, e2) = (e1 as usize, e2 as usize);

        let mut key_to_new_index: FxHashMap<&Key, usize> = FxHashMap::default();
        for (offset, child) in c2[s2..=e2].iter().enumerate() {
            if let Some(key) = child.key() {
                // Duplicate keys: last write wins
                key_to_new_index.insert(key, s2 + offset);
            }
        }

        let to_be_patched = e2 - s2 + 1;
        let mut patched = 0usize;
        let mut moved = false;
        let mut max_new_index_so_far = 0usize;
        // new slot -> old index + 1; 0 means mount fresh
        let mut new_index_to_old_index = vec![0usize; to_be_patched];

        for old_index in s1..=e1 {
            let prev_child = &c1[old_index];
            if patched >= to_be_patched {
                self.unmount(prev_child);
                continue;
            }

            let new_index = match prev_child.key() {
                Some(key) => key_to_new_index.get(key).copied(),
                None => (s2..=e2).find(|&j| {
                    new_index_to_old_index[j - s2] == 0 && is_same_vnode_type(prev_child, &c2[j])
                }),
            };

            match new_index {
                None => self.unmount(prev_child),
                Some(new_index) => {
                    new_index_to_old_index[new_index - s2] = old_index + 1;
                    if new_index >= max_new_index_so_far {
                        max_new_index_so_far = new_index;
                    } else {
                        moved = true;
                    }
                    self.patch(Some(prev_child), &c2[new_index], container, parent_anchor);
                    patched += 1;
                }
            }
        }

        // 4. Nodes in the longest increasing subsequence stay in place
        let sequence = if moved {
            get_sequence(&new_index_to_old_index)
        } else {
            Vec::new()
        };
        let mut j = sequence.len() as isize - 1;

        // 5. Back to front so each anchor is already in its final place
        for slot in (0..to_be_patched).rev() {
            let new_index = s2 + slot;
            let new_child = &c2[new_index];
            let anchor = if new_index + 1 < l2 {
                self.first_host_node(&c2[new_index + 1])
            } else {
                parent_anchor
            };

            if new_index_to_old_index[slot] == 0 {
                self.patch(None, new_child, container, anchor);
            } else if moved {
                if j < 0 || slot != sequence[j as usize] {
                    self.move_vnode(new_child, container, anchor);
                } else {
                    j -= 1;
                }
            }
        }
    }
}

/// Indices of a longest increasing subsequence of `arr`, ignoring zeros.
///
/// Patience sorting with binary search over subsequence tails and
/// predecessor links, O(n log n). Index 0 seeds the tails even if `arr[0]`
/// is zero; callers only consult the result for non-zero slots.
pub fn get_sequence(arr: &[usize]) -> Vec<usize> {
    if arr.is_empty() {
        return Vec::new();
    }

    let mut predecessors = arr.to_vec();
    let mut result: Vec<usize> = vec![0];

    for (i, &value) in arr.iter().enumerate() {
        if value == 0 {
            continue;
        }

        let last = result[result.len() - 1];
        if value > arr[last] {
            predecessors[i] = last;
            result.push(i);
            continue;
        }

        let (mut lo, mut hi) = (0usize, result.len() - 1);
        while lo < hi {
            let mid = (lo + hi) >> 1;
            if arr[result[mid]] < value {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        if value < arr[result[lo]] {
            if lo > 0 {
                predecessors[i] = result[lo - 1];
            }
            result[lo] = i;
        }
    }

    let mut u = result.len();
    let mut v = result[u - 1];
    while u > 0 {
        u -= 1;
        result[u] = v;
        v = predecessors[v];
    }
    result
}
