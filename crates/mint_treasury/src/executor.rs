//! Fixed-partition parallel executor
//!
//! `N` tasks are split across `K = min(N, cores)` OS threads; worker `i`
//! owns the contiguous index range `[N·i/K, N·(i+1)/K)`. Tasks must be
//! independent. All results are ordered by task index, never by completion
//! order, and every worker always runs its whole slice: a failing task
//! poisons the verdict but does not abort its peers.

use std::num::NonZeroUsize;
use std::thread;

fn worker_count(n_tasks: usize) -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(n_tasks)
}

fn ranges(n_tasks: usize, workers: usize) -> impl Iterator<Item = std::ops::Range<usize>> {
    (0..workers).map(move |i| (n_tasks * i / workers)..(n_tasks * (i + 1) / workers))
}

/// Run `task` for every index and collect the results in index order
pub fn map<T, F>(n_tasks: usize, task: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    if n_tasks == 0 {
        return Vec::new();
    }
    let workers = worker_count(n_tasks);
    let task = &task;

    thread::scope(|scope| {
        let handles: Vec<_> = ranges(n_tasks, workers)
            .map(|range| scope.spawn(move || range.map(|i| task(i)).collect::<Vec<T>>()))
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("executor worker panicked"))
            .collect()
    })
}

/// Run a verification task for every index. Each worker keeps its own
/// verdict slot; the result is the conjunction over all slots.
pub fn verify_all<F>(n_tasks: usize, verify: F) -> bool
where
    F: Fn(usize) -> bool + Sync,
{
    if n_tasks == 0 {
        return true;
    }
    let workers = worker_count(n_tasks);
    let verify = &verify;

    thread::scope(|scope| {
        let handles: Vec<_> = ranges(n_tasks, workers)
            .map(|range| {
                scope.spawn(move || {
                    range.fold(true, |ok, i| {
                        let valid = verify(i);
                        ok & valid
                    })
                })
            })
            .collect();

        handles.into_iter().fold(true, |ok, handle| {
            let valid = handle.join().expect("executor worker panicked");
            ok & valid
        })
    })
}

/// Like [`verify_all`], but each task also gets exclusive mutable access to
/// its slice element
pub fn verify_each_mut<T, F>(items: &mut [T], verify: F) -> bool
where
    T: Send,
    F: Fn(usize, &mut T) -> bool + Sync,
{
    let n_tasks = items.len();
    if n_tasks == 0 {
        return true;
    }
    let workers = worker_count(n_tasks);
    let verify = &verify;

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        let mut rest = items;
        let mut start = 0;
        for i in 0..workers {
            let end = n_tasks * (i + 1) / workers;
            let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(end - start);
            rest = tail;

            handles.push(scope.spawn(move || {
                chunk.iter_mut().enumerate().fold(true, |ok, (j, item)| {
                    let valid = verify(start + j, item);
                    ok & valid
                })
            }));
            start = end;
        }

        handles.into_iter().fold(true, |ok, handle| {
            let valid = handle.join().expect("executor worker panicked");
            ok & valid
        })
    })
}
