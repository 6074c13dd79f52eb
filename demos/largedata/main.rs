use std::time::Instant;

use rand::Rng;

use maxweight_matching::{Edge, Matching, Vertex};

const N: Vertex = 2000;

fn main() {
    env_logger::init();

    let mut rng = rand::thread_rng();
    let mut edges: Vec<Edge<i32>> = vec![];
    for i in 0..N - 1 {
        for j in i + 1..N {
            let wt: i32 = rng.gen_range(-50..50);
            edges.push((i, j, wt));
        }
    }

    let now = Instant::now();
    match Matching::new(edges).solve() {
        Ok(pairs) => println!("Matched {} pairs", pairs.len()),
        Err(err) => eprintln!("Matching failed: {}", err),
    }
    println!("Elapsed time: {:?}", now.elapsed());
}
