/// Implements index-typed arena plumbing for a `struct $arena { inner: Vec<$elt> }`.
///
/// Points are addressed by `$idx` rather than by `usize` so that an index into
/// one arena can't accidentally be used to look something up in another.
macro_rules! impl_typed_vec {
    ($arena:ident, $elt:ty, $idx:ident, $dbg_prefix:expr) => {
        impl std::fmt::Debug for $idx {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", $dbg_prefix, self.0)
            }
        }

        #[allow(dead_code)]
        impl $arena {
            /// Creates an empty arena with room for `cap` elements.
            pub fn with_capacity(cap: usize) -> Self {
                Self {
                    inner: Vec::with_capacity(cap),
                }
            }

            /// All valid indices, in insertion order.
            pub fn indices(&self) -> impl Iterator<Item = $idx> {
                (0..self.inner.len()).map($idx)
            }

            /// The number of elements.
            pub fn len(&self) -> usize {
                self.inner.len()
            }

            /// Are we empty?
            pub fn is_empty(&self) -> bool {
                self.inner.is_empty()
            }

            /// Drops every element, keeping the allocation.
            pub fn clear(&mut self) {
                self.inner.clear();
            }

            pub(crate) fn push(&mut self, elt: $elt) -> $idx {
                self.inner.push(elt);
                $idx(self.inner.len() - 1)
            }

            /// Iterates over indices and elements.
            pub fn iter(&self) -> impl Iterator<Item = ($idx, &$elt)> + '_ {
                self.inner
                    .iter()
                    .enumerate()
                    .map(|(idx, elt)| ($idx(idx), elt))
            }
        }

        impl Default for $arena {
            fn default() -> Self {
                Self { inner: Vec::new() }
            }
        }

        impl std::ops::Index<$idx> for $arena {
            type Output = $elt;

            fn index(&self, index: $idx) -> &Self::Output {
                &self.inner[index.0]
            }
        }

        impl std::fmt::Debug for $arena {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                struct Entry<'a> {
                    idx: $idx,
                    inner: &'a $elt,
                }

                impl std::fmt::Debug for Entry<'_> {
                    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        write!(f, "{idx:?}: {inner:?}", idx = self.idx, inner = self.inner)
                    }
                }

                let mut list = f.debug_list();
                for (idx, inner) in self.iter() {
                    list.entry(&Entry { idx, inner });
                }
                list.finish()
            }
        }
    };
}
