use dyn_kd_tree::{Error, FixedTree, NearestNeighbors, Point, PointId, Tree, TreeConfig, TreeRX, INFER_DIMS};

use kdam::tqdm;
use log::{info, warn};
use rand::prelude::*;
use std::time::Instant;

use clap::Parser;
#[derive(Parser, Debug)] #[command(author, version, about, long_about = None)]
struct Args {

    ///Point dimensions to benchmark, one run each
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![2, 4, 7])]
    dims: Vec<usize>,

    ///Number of random points inserted per run
    #[arg(short, long, default_value_t = 10000)]
    num_points: usize,

    ///Neighbors asked for per query
    #[arg(short, long, default_value_t = 5)]
    k: usize,

    ///Number of random queries per run
    #[arg(short, long, default_value_t = 100)]
    queries: usize,

    ///Seed for the random points and queries
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    ///YAML tree config, defaults are used when missing
    #[arg(short, long)]
    config: Option<String>,

    ///Insert everything without restructuring and rebuild once at the end
    #[arg(long)]
    deferred: bool,
}

fn main() -> Result<(), Error> {

    env_logger::init();

    let args = Args::parse();
    dbg!(&args);

    let config = match &args.config {
        Some(filename) => TreeConfig::from_file(filename)?,
        None => TreeConfig::default(),
    };

    three_point_example(&config)?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut mismatches = 0;

    for &dims in args.dims.iter() {
        mismatches += match dims {
            2 => compare_trees::<2>(&args, &config, &mut rng)?,
            4 => compare_trees::<4>(&args, &config, &mut rng)?,
            7 => compare_trees::<7>(&args, &config, &mut rng)?,
            _ => {
                warn!("no fixed-dimension tree for {} dims, timing the runtime tree only", dims);
                let points = random_points(&mut rng, args.num_points, dims);
                let queries = random_points(&mut rng, args.queries, dims);
                let tree: TreeRX = build(dims as i64, &config, &points, args.deferred)?;
                run_queries(&tree, &queries, args.k)?;
                0
            },
        };
    }

    match mismatches {
        0 => info!("all runs agree"),
        n => warn!("{} queries disagreed between fixed and runtime trees", n),
    }

    Ok(())
}

fn three_point_example(config: &TreeConfig) -> Result<(), Error> {

    let mut tree = TreeRX::with_config(2, config.clone())?;
    tree.add_point(&[0.0, 0.0], 0, true)?;
    tree.add_point(&[0.0, 1.0], 1, true)?;
    tree.add_point(&[0.0, 2.0], 2, true)?;

    let nn = tree.search(&[0.0, 2.1])?;
    info!("nearest to [0, 2.1]: id {} distance {}", nn.id, nn.distance);

    let knn = tree.search_knn(&[0.0, 2.1], 2)?;
    info!("2 nearest to [0, 2.1]: {}", knn.to_json()?);

    Ok(())
}

fn random_points(rng: &mut StdRng, n: usize, dims: usize) -> Vec<Vec<f64>> {
    (0..n).map(|_| (0..dims).map(|_| rng.gen::<f64>()).collect()).collect()
}

fn build<P: Point>(dims: i64, config: &TreeConfig, points: &[Vec<f64>], deferred: bool) -> Result<Tree<P>, Error> {

    let mut tree = Tree::<P>::with_config(dims, config.clone())?;

    let start = Instant::now();
    for (i, point) in tqdm!(points.iter().enumerate()) {
        tree.add_point(point, i as PointId, !deferred)?;
    }

    if deferred {
        tree.rebuild();
    }

    info!(
        "built {}-dim tree of {} points in {:.4}s: depth {}, {} leaves",
        points.first().map_or(0, |x| x.len()),
        tree.len(),
        start.elapsed().as_secs_f64(),
        tree.depth(),
        tree.num_leaves()
    );

    return Ok(tree);
}

fn run_queries<P: Point>(tree: &Tree<P>, queries: &[Vec<f64>], k: usize) -> Result<Vec<NearestNeighbors>, Error> {

    let start = Instant::now();

    let mut results = Vec::with_capacity(queries.len());
    for query in queries.iter() {
        results.push(tree.search_knn(query, k)?);
    }

    info!("{} knn queries (k = {}) in {:.6}s", queries.len(), k, start.elapsed().as_secs_f64());

    return Ok(results);
}

///Builds a fixed and a runtime tree over the same points and returns how many queries they
///answered differently
fn compare_trees<const D: usize>(args: &Args, config: &TreeConfig, rng: &mut StdRng) -> Result<usize, Error> {

    let points = random_points(rng, args.num_points, D);
    let queries = random_points(rng, args.queries, D);

    info!("runtime tree, {} dims", D);
    let runtime: TreeRX = build(D as i64, config, &points, args.deferred)?;
    let runtime_results = run_queries(&runtime, &queries, args.k)?;

    info!("fixed tree, {} dims", D);
    let fixed: FixedTree<D> = build(INFER_DIMS, config, &points, args.deferred)?;
    let fixed_results = run_queries(&fixed, &queries, args.k)?;

    if let Some(first) = fixed_results.first() {
        info!("first query: {}", first.to_json()?);
    }

    let mismatches = runtime_results
        .iter()
        .zip(fixed_results.iter())
        .filter(|(a, b)| a != b)
        .count();

    return Ok(mismatches);
}
