use std::fmt::Display;

use mimalloc::MiMalloc;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use shumai::{config, ShumaiBench};

use koel::{CuckooSet, LockedSet, SequentialSet, SingleThreaded, TransactionalSet};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Serialize, Clone, Copy, Debug, Deserialize)]
pub enum Backend {
    Sequential,
    Locked,
    Transactional,
}

impl Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[config(path = "bench/benchmark.toml")]
pub struct Mixed {
    pub name: String,
    pub threads: Vec<usize>,
    pub time: usize,
    #[matrix]
    pub backend: Backend,
}

const INITIAL_CNT: usize = 100_000;

struct SetBench<S> {
    set: S,
    initial_cnt: usize,
}

impl<S: CuckooSet<u64> + Send + Sync> ShumaiBench for SetBench<S> {
    type Config = Mixed;
    type Result = usize;

    fn load(&mut self) -> Option<serde_json::Value> {
        for i in 0..self.initial_cnt as u64 {
            self.set.add(i);
        }
        None
    }

    fn run(&self, context: shumai::Context<Self::Config>) -> Self::Result {
        let mut rng = thread_rng();
        let key_space = (self.initial_cnt * 2) as u64;
        let mut op_cnt = 0;

        context.wait_for_start();

        while context.is_running() {
            let key = rng.gen_range(0..key_space);
            let draw = rng.gen::<f64>();
            if draw < 0.8 {
                self.set.contains(&key);
            } else if draw < 0.9 {
                self.set.add(key);
            } else {
                self.set.remove(&key);
            }
            op_cnt += 1;
        }
        op_cnt
    }

    fn cleanup(&mut self) -> Option<serde_json::Value> {
        None
    }
}

fn main() {
    let config = Mixed::load().expect("Failed to parse config!");
    let repeat = 3;

    for c in config.iter() {
        match c.backend {
            Backend::Sequential => {
                if c.threads.len() > 1 || c.threads[0] != 1 {
                    panic!("the sequential backend only supports a single thread!");
                }
                let mut bench = SetBench {
                    set: SingleThreaded(SequentialSet::<u64>::new(2 * INITIAL_CNT)),
                    initial_cnt: INITIAL_CNT,
                };
                let result = shumai::run(&mut bench, c, repeat);
                result.write_json().unwrap();
            }
            Backend::Locked => {
                let mut bench = SetBench {
                    set: LockedSet::<u64>::new(2 * INITIAL_CNT),
                    initial_cnt: INITIAL_CNT,
                };
                let result = shumai::run(&mut bench, c, repeat);
                result.write_json().unwrap();
            }
            Backend::Transactional => {
                let mut bench = SetBench {
                    set: TransactionalSet::<u64>::new(2 * INITIAL_CNT),
                    initial_cnt: INITIAL_CNT,
                };
                let result = shumai::run(&mut bench, c, repeat);
                result.write_json().unwrap();
            }
        }
    }
}
