/// Largest pool the exhaustive fallback will enumerate (6! = 720 orderings).
pub const MAX_EXHAUSTIVE: usize = 6;

/// Deterministic index orderings for a small card pool.
pub struct Orderings {
    orderings: Vec<Vec<usize>>,
}

impl Orderings {
    /// Every ordering of `0..len`, identity first. Pools above `MAX_EXHAUSTIVE`
    /// yield nothing.
    pub fn new(len: usize) -> Self {
        let mut orderings = Vec::new();
        if (1..=MAX_EXHAUSTIVE).contains(&len) {
            let mut base: Vec<usize> = (0..len).collect();
            generate(&mut base, 0, &mut orderings);
        }
        Self { orderings }
    }

    pub fn as_slice(&self) -> &[Vec<usize>] {
        &self.orderings
    }

    pub fn len(&self) -> usize {
        self.orderings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orderings.is_empty()
    }
}

fn generate(data: &mut [usize], start: usize, output: &mut Vec<Vec<usize>>) {
    if start + 1 >= data.len() {
        output.push(data.to_vec());
        return;
    }

    for idx in start..data.len() {
        data.swap(start, idx);
        generate(data, start + 1, output);
        data.swap(start, idx);
    }
}
