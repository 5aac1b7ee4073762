//! Inverted-file partitioning.
//!
//! Vectors are clustered with seeded k-means; a query scans the lists whose
//! centroids are closest to it. Training is deterministic for a given seed
//! and entry order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use c4rag_core::config::IvfConfig;

use crate::metric::squared_l2;

#[derive(Debug, Clone)]
pub struct IvfLists {
	centroids: Vec<Vec<f32>>,
	lists: Vec<Vec<usize>>,
	nprobe: usize,
}

impl IvfLists {
	/// Train over `vectors`; `nlist` is clamped to the number of vectors.
	pub fn train(vectors: &[Vec<f32>], config: &IvfConfig) -> Self {
		let n = vectors.len();
		let nlist = config.nlist.clamp(1, n.max(1));
		if n == 0 {
			return Self { centroids: Vec::new(), lists: Vec::new(), nprobe: config.nprobe };
		}
		let mut rng = StdRng::seed_from_u64(config.seed);
		let mut centroids = init_centroids(vectors, nlist, &mut rng);
		let mut assignment = vec![usize::MAX; n];

		for iteration in 0..config.max_iterations {
			let mut changed = 0usize;
			for (i, v) in vectors.iter().enumerate() {
				let best = nearest(&centroids, v);
				if assignment[i] != best { assignment[i] = best; changed += 1; }
			}
			if changed == 0 {
				debug!(iteration, "k-means converged");
				break;
			}
			let dim = vectors[0].len();
			let mut sums = vec![vec![0.0f32; dim]; nlist];
			let mut counts = vec![0usize; nlist];
			for (v, &c) in vectors.iter().zip(&assignment) {
				counts[c] += 1;
				for (s, x) in sums[c].iter_mut().zip(v) { *s += x; }
			}
			for (c, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
				// empty lists keep their previous centroid
				if count > 0 { centroids[c] = sum.into_iter().map(|s| s / count as f32).collect(); }
			}
		}

		let mut lists = vec![Vec::new(); nlist];
		for (i, v) in vectors.iter().enumerate() { lists[nearest(&centroids, v)].push(i); }
		Self { centroids, lists, nprobe: config.nprobe }
	}

	pub fn nlist(&self) -> usize { self.lists.len() }

	/// Entry positions from the `nprobe` closest lists, widened with further
	/// lists until at least `min_candidates` positions are collected.
	pub fn candidates(&self, query: &[f32], min_candidates: usize) -> Vec<usize> {
		let mut order: Vec<(usize, f32)> = self.centroids.iter().enumerate().map(|(c, centroid)| (c, squared_l2(query, centroid))).collect();
		order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
		let mut out = Vec::new();
		for (probed, (c, _)) in order.into_iter().enumerate() {
			if probed >= self.nprobe && out.len() >= min_candidates { break; }
			out.extend_from_slice(&self.lists[c]);
		}
		out
	}
}

/// k-means++ seeding: each further centroid is drawn with probability
/// proportional to its squared distance from the closest chosen one.
fn init_centroids(vectors: &[Vec<f32>], nlist: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
	let first = rng.gen_range(0..vectors.len());
	let mut centroids = vec![vectors[first].clone()];
	let mut d2: Vec<f32> = vectors.iter().map(|v| squared_l2(v, &centroids[0])).collect();
	while centroids.len() < nlist {
		let total: f32 = d2.iter().sum();
		let mut pick = d2.iter().rposition(|&d| d > 0.0).unwrap_or(0);
		if total > 0.0 {
			let mut target = rng.gen::<f32>() * total;
			for (i, &d) in d2.iter().enumerate() {
				if d <= 0.0 { continue; }
				target -= d;
				if target <= 0.0 { pick = i; break; }
			}
		}
		let chosen = vectors[pick].clone();
		for (d, v) in d2.iter_mut().zip(vectors) { *d = d.min(squared_l2(v, &chosen)); }
		centroids.push(chosen);
	}
	centroids
}

fn nearest(centroids: &[Vec<f32>], v: &[f32]) -> usize {
	let mut best = 0usize;
	let mut best_d = f32::INFINITY;
	for (c, centroid) in centroids.iter().enumerate() {
		let d = squared_l2(v, centroid);
		if d < best_d { best_d = d; best = c; }
	}
	best
}
