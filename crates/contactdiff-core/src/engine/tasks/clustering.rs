use super::difference::{DifferenceMatrix, hot_residues};
use crate::engine::config::{ClusteringConfig, ConfigError};
use crate::engine::error::EngineError;
use nalgebra::{DMatrix, Point2, SymmetricEigen};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

const EMBEDDING_DIMENSIONS: usize = 2;

/// Cluster labels and the 2-D embedding of a residue subset.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    /// Correspondence indices of the clustered residues, in row order.
    pub indices: Vec<usize>,
    pub labels: Vec<usize>,
    /// One row per residue, one column per principal component.
    pub embedding: DMatrix<f64>,
    /// One row per cluster.
    pub centroids: DMatrix<f64>,
    pub inertia: f64,
    /// Variance captured by each principal component.
    pub explained_variance: [f64; EMBEDDING_DIMENSIONS],
}

impl ClusterAssignment {
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            labels: Vec::new(),
            embedding: DMatrix::zeros(0, EMBEDDING_DIMENSIONS),
            centroids: DMatrix::zeros(0, EMBEDDING_DIMENSIONS),
            inertia: 0.0,
            explained_variance: [0.0; EMBEDDING_DIMENSIONS],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Clusters the hot residues of a difference matrix by their difference profiles.
#[instrument(skip_all, name = "clustering_task")]
pub fn cluster(
    difference: &DifferenceMatrix,
    config: &ClusteringConfig,
) -> Result<ClusterAssignment, EngineError> {
    config.validate()?;
    let subset = hot_residues(difference, config.percentile);
    if subset.is_empty() {
        info!("No residues above the clustering percentile; skipping clustering.");
        return Ok(ClusterAssignment::empty());
    }
    let submatrix = difference.submatrix(&subset);
    cluster_submatrix(&submatrix, subset, config)
}

/// Clusters the rows of `submatrix`; `indices` names the residue behind each row.
pub fn cluster_submatrix(
    submatrix: &DMatrix<f64>,
    indices: Vec<usize>,
    config: &ClusteringConfig,
) -> Result<ClusterAssignment, EngineError> {
    config.validate()?;
    if indices.len() != submatrix.nrows() {
        return Err(EngineError::Internal(format!(
            "{} residue indices supplied for {} matrix rows",
            indices.len(),
            submatrix.nrows()
        )));
    }
    if indices.is_empty() {
        return Ok(ClusterAssignment::empty());
    }
    if config.n_clusters > indices.len() {
        return Err(ConfigError::TooManyClusters {
            k: config.n_clusters,
            available: indices.len(),
        }
        .into());
    }

    let (embedding, explained_variance) = principal_components(submatrix);
    let points: Vec<Point2<f64>> = embedding
        .row_iter()
        .map(|row| Point2::new(row[0], row[1]))
        .collect();
    let fit = kmeans(&points, config);

    info!(
        residues = indices.len(),
        clusters = config.n_clusters,
        inertia = fit.inertia,
        "Clustering complete."
    );

    let centroids = DMatrix::from_fn(fit.centroids.len(), EMBEDDING_DIMENSIONS, |r, c| {
        fit.centroids[r][c]
    });
    Ok(ClusterAssignment {
        indices,
        labels: fit.labels,
        embedding,
        centroids,
        inertia: fit.inertia,
        explained_variance,
    })
}

/// Projects rows onto the two leading principal components of the column-centred data.
///
/// Each component's sign makes its largest-magnitude loading positive. Components that do
/// not exist (fewer samples or features than two) are returned as zero columns.
fn principal_components(data: &DMatrix<f64>) -> (DMatrix<f64>, [f64; EMBEDDING_DIMENSIONS]) {
    let (n, d) = data.shape();
    let mut embedding = DMatrix::zeros(n, EMBEDDING_DIMENSIONS);
    let mut explained = [0.0; EMBEDDING_DIMENSIONS];
    if n < 2 || d == 0 {
        return (embedding, explained);
    }

    let mut centered = data.clone();
    for mut column in centered.column_iter_mut() {
        let mean = column.mean();
        column.add_scalar_mut(-mean);
    }
    let covariance = (centered.transpose() * &centered) / (n as f64 - 1.0);
    let eigen = SymmetricEigen::new(covariance);

    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .total_cmp(&eigen.eigenvalues[a])
            .then(a.cmp(&b))
    });

    for (component, &col) in order.iter().take(EMBEDDING_DIMENSIONS.min(n)).enumerate() {
        let mut axis = eigen.eigenvectors.column(col).into_owned();
        let dominant = axis
            .iter()
            .copied()
            .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if dominant < 0.0 {
            axis.neg_mut();
        }
        embedding.set_column(component, &(&centered * axis));
        explained[component] = eigen.eigenvalues[col].max(0.0);
    }
    debug!(?explained, "Principal components computed.");
    (embedding, explained)
}

struct KMeansFit {
    labels: Vec<usize>,
    centroids: Vec<Point2<f64>>,
    inertia: f64,
}

/// Lloyd's algorithm from k-means++ seeds; the restart with the lowest inertia wins.
fn kmeans(points: &[Point2<f64>], config: &ClusteringConfig) -> KMeansFit {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<KMeansFit> = None;

    for restart in 0..config.restarts {
        let seeds = kmeans_plus_plus(points, config.n_clusters, &mut rng);
        let fit = lloyd(points, seeds, config.max_iterations);
        debug!(restart, inertia = fit.inertia, "k-means restart finished.");
        if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }

    // `restarts` is validated to be at least one.
    best.unwrap_or(KMeansFit {
        labels: vec![0; points.len()],
        centroids: Vec::new(),
        inertia: 0.0,
    })
}

fn kmeans_plus_plus(points: &[Point2<f64>], k: usize, rng: &mut StdRng) -> Vec<Point2<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| nearest(p, &centroids).1)
            .collect();
        let next = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            // Every point coincides with a centroid.
            Err(_) => rng.gen_range(0..points.len()),
        };
        centroids.push(points[next]);
    }
    centroids
}

fn lloyd(points: &[Point2<f64>], mut centroids: Vec<Point2<f64>>, max_iterations: usize) -> KMeansFit {
    let k = centroids.len();
    let mut labels = assign(points, &centroids);

    for _ in 0..max_iterations {
        let mut sums = vec![(0.0, 0.0, 0usize); k];
        for (point, &label) in points.iter().zip(&labels) {
            sums[label].0 += point.x;
            sums[label].1 += point.y;
            sums[label].2 += 1;
        }
        for (cluster, &(sx, sy, count)) in sums.iter().enumerate() {
            if count > 0 {
                centroids[cluster] = Point2::new(sx / count as f64, sy / count as f64);
            } else {
                centroids[cluster] = farthest_point(points, &labels, &centroids);
            }
        }

        let next = assign(points, &centroids);
        if next == labels {
            break;
        }
        labels = next;
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &label)| nalgebra::distance_squared(p, &centroids[label]))
        .sum();
    KMeansFit {
        labels,
        centroids,
        inertia,
    }
}

fn assign(points: &[Point2<f64>], centroids: &[Point2<f64>]) -> Vec<usize> {
    points.iter().map(|p| nearest(p, centroids).0).collect()
}

/// Index of and squared distance to the closest centroid; ties go to the lowest index.
fn nearest(point: &Point2<f64>, centroids: &[Point2<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(idx, c)| (idx, nalgebra::distance_squared(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

fn farthest_point(points: &[Point2<f64>], labels: &[usize], centroids: &[Point2<f64>]) -> Point2<f64> {
    let (farthest, _) = points
        .iter()
        .zip(labels)
        .map(|(p, &label)| (p, nalgebra::distance_squared(p, &centroids[label])))
        .fold((&points[0], f64::NEG_INFINITY), |best, cur| {
            if cur.1 > best.1 { cur } else { best }
        });
    *farthest
}
