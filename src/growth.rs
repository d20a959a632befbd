// Growth policy: how we turn a requested capacity into an actual bucket
// count, and a hash into a bucket index. Kept behind a trait so the map
// never bakes in the power-of-two assumption itself — swap in a different
// policy (prime capacities + modulo, say) without touching map.rs.
pub trait GrowthPolicy {
    fn minimum_capacity() -> usize;

    // smallest admissible capacity >= min_capacity
    fn compute_closest_capacity(min_capacity: usize) -> usize;

    // maps a hash into [0, capacity)
    fn compute_index(hash: u64, capacity: usize) -> usize;
}

// Default policy. Bucket counts are always a power of two so compute_index
// can mask instead of mod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowerOfTwoGrowthPolicy;

impl GrowthPolicy for PowerOfTwoGrowthPolicy {
    fn minimum_capacity() -> usize {
        8
    }

    fn compute_closest_capacity(min_capacity: usize) -> usize {
        if min_capacity <= 1 {
            return 1;
        }

        // round up to the next power of two
        let mut n = min_capacity - 1;
        n |= n >> 1;
        n |= n >> 2;
        n |= n >> 4;
        n |= n >> 8;
        n |= n >> 16;
        #[cfg(target_pointer_width = "64")]
        {
            n |= n >> 32;
        }
        n + 1
    }

    fn compute_index(hash: u64, capacity: usize) -> usize {
        debug_assert!(capacity.is_power_of_two());
        (hash as usize) & (capacity - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_capacity_is_eight() {
        assert_eq!(PowerOfTwoGrowthPolicy::minimum_capacity(), 8);
    }

    #[test]
    fn closest_capacity_rounds_up_to_power_of_two() {
        assert_eq!(PowerOfTwoGrowthPolicy::compute_closest_capacity(0), 1);
        assert_eq!(PowerOfTwoGrowthPolicy::compute_closest_capacity(1), 1);
        assert_eq!(PowerOfTwoGrowthPolicy::compute_closest_capacity(8), 8);
        assert_eq!(PowerOfTwoGrowthPolicy::compute_closest_capacity(9), 16);
        assert_eq!(PowerOfTwoGrowthPolicy::compute_closest_capacity(1000), 1024);
        assert_eq!(PowerOfTwoGrowthPolicy::compute_closest_capacity(1143), 2048);
    }

    #[test]
    fn compute_index_is_a_mask() {
        assert_eq!(PowerOfTwoGrowthPolicy::compute_index(0b1010_1010, 8), 0b010);
        assert_eq!(PowerOfTwoGrowthPolicy::compute_index(u64::MAX, 16), 15);
    }
}
