// Entries live in one packed Vec instead of one Vec per bucket. A small
// bucket directory just holds the head index of each bucket's chain, and
// each entry threads the rest of the chain through its own `next` index.
// Iterating the whole map is then a plain slice walk instead of hopping
// bucket to bucket.
//
// The tricky bit is erasure: removing an entry swaps it with the last one
// in the array to keep things dense, so whichever chain pointed at that
// last entry has to be patched to point at the new spot. See
// `DenseMap::remove_index`.

mod bucket_iter;
mod entry;
mod growth;
mod iter;
mod map;
mod slot;

pub use bucket_iter::BucketIter;
pub use entry::{Entry, OccupiedEntry, VacantEntry};
pub use growth::{GrowthPolicy, PowerOfTwoGrowthPolicy};
pub use iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
pub use map::{erase_if, DenseMap};
