//! Change-mask primitives: smoothing, differencing, dilation and connected
//! component extraction.

use ndarray::{Array2, ArrayView2, Zip};

/// Separable box blur with edge replication.  Window is `2 * radius + 1`
/// pixels on each axis; radius 0 returns a copy.
pub fn box_blur(src: &ArrayView2<u8>, radius: usize) -> Array2<u8> {
    if radius == 0 {
        return src.to_owned();
    }
    let horizontal = blur_rows(src, radius);
    let transposed = blur_rows(&horizontal.t(), radius);
    transposed.reversed_axes()
}

/// Running-sum blur along each row.
fn blur_rows(src: &ArrayView2<u8>, radius: usize) -> Array2<u8> {
    let (height, width) = src.dim();
    let mut out = Array2::zeros((height, width));
    if width == 0 {
        return out;
    }
    let window = (2 * radius + 1) as u32;
    let r = radius as isize;
    let last = width as isize - 1;
    let at = |row: &ndarray::ArrayView1<u8>, i: isize| u32::from(row[i.clamp(0, last) as usize]);

    for (row, mut dst) in src.rows().into_iter().zip(out.rows_mut()) {
        let mut sum: u32 = (-r..=r).map(|i| at(&row, i)).sum();
        for x in 0..width {
            dst[x] = ((sum + window / 2) / window) as u8;
            let xi = x as isize;
            sum = sum + at(&row, xi + r + 1) - at(&row, xi - r);
        }
    }
    out
}

/// Pixels whose absolute intensity difference exceeds `threshold`.
pub fn change_mask(current: &ArrayView2<u8>, baseline: &ArrayView2<u8>, threshold: u8) -> Array2<bool> {
    Zip::from(current)
        .and(baseline)
        .map_collect(|&a, &b| a.abs_diff(b) > threshold)
}

/// Binary dilation with a 3x3 square element, repeated `iterations` times.
pub fn dilate(mask: &Array2<bool>, iterations: u32) -> Array2<bool> {
    let mut current = mask.clone();
    let (height, width) = mask.dim();
    for _ in 0..iterations {
        let src = current;
        current = Array2::from_shape_fn((height, width), |(r, c)| {
            let r0 = r.saturating_sub(1);
            let c0 = c.saturating_sub(1);
            let r1 = (r + 1).min(height - 1);
            let c1 = (c + 1).min(width - 1);
            (r0..=r1).any(|rr| (c0..=c1).any(|cc| src[[rr, cc]]))
        });
    }
    current
}

/// A connected region of set pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Pixel count.
    pub area: u32,
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl Component {
    fn seed(row: usize, col: usize) -> Self {
        Self {
            area: 0,
            min_row: row,
            min_col: col,
            max_row: row,
            max_col: col,
        }
    }

    fn include(&mut self, row: usize, col: usize) {
        self.area += 1;
        self.min_row = self.min_row.min(row);
        self.min_col = self.min_col.min(col);
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }
}

fn find_root(parents: &mut [usize], label: usize) -> usize {
    let mut current = label;
    while current != parents[current] {
        parents[current] = parents[parents[current]];
        current = parents[current];
    }
    current
}

fn union_labels(parents: &mut [usize], a: usize, b: usize) {
    let root_a = find_root(parents, a);
    let root_b = find_root(parents, b);
    if root_a < root_b {
        parents[root_b] = root_a;
    } else if root_b < root_a {
        parents[root_a] = root_b;
    }
}

/// Two-pass union-find labelling with 8-connectivity.  Returns one
/// [`Component`] per region, in order of first appearance (raster order).
pub fn connected_components(mask: &ArrayView2<bool>) -> Vec<Component> {
    let (height, width) = mask.dim();
    let mut labels = Array2::<usize>::zeros((height, width));
    // Label 0 is background.
    let mut parents = vec![0usize];

    // First pass: provisional labels from the already-visited neighbours
    // (upper-left, up, upper-right, left).
    for r in 0..height {
        for c in 0..width {
            if !mask[[r, c]] {
                continue;
            }
            let mut neighbours = [0usize; 4];
            if r > 0 {
                if c > 0 {
                    neighbours[0] = labels[[r - 1, c - 1]];
                }
                neighbours[1] = labels[[r - 1, c]];
                if c + 1 < width {
                    neighbours[2] = labels[[r - 1, c + 1]];
                }
            }
            if c > 0 {
                neighbours[3] = labels[[r, c - 1]];
            }

            let smallest = neighbours.iter().copied().filter(|&l| l > 0).min();
            match smallest {
                None => {
                    let label = parents.len();
                    parents.push(label);
                    labels[[r, c]] = label;
                }
                Some(min_label) => {
                    labels[[r, c]] = min_label;
                    for &l in neighbours.iter().filter(|&&l| l > 0 && l != min_label) {
                        union_labels(&mut parents, min_label, l);
                    }
                }
            }
        }
    }

    // Second pass: resolve every provisional label to its root and
    // accumulate per-root statistics.
    let mut slot_of_root = vec![usize::MAX; parents.len()];
    let mut components: Vec<Component> = Vec::new();
    for ((r, c), &label) in labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        let root = find_root(&mut parents, label);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = components.len();
            components.push(Component::seed(r, c));
        }
        components[slot_of_root[root]].include(r, c);
    }
    components
}
