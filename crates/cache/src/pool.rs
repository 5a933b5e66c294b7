//! Fixed-size worker pool fed through a bounded queue
//!
//! The producer pushes work items into a bounded channel, `workers` threads
//! process them, and a single collector thread gathers whatever the workers
//! emit. The first worker error stops the producer; remaining queued items
//! are drained without being processed and the error is returned.

use crate::errors::{CacheError, Result};
use crossbeam::channel::{self, Sender};
use crossbeam::select;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Run `work` over `items` on `workers` threads
///
/// `work` receives one item and a sender for its outputs. Outputs are
/// returned in arrival order, which is unspecified across workers.
pub(crate) fn run<T, R, I, F>(label: &'static str, workers: usize, items: I, work: F) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    I: IntoIterator<Item = T>,
    F: Fn(T, &Sender<R>) -> Result<()> + Sync,
{
    let workers = workers.max(1);
    let (item_tx, item_rx) = channel::bounded::<T>(workers);
    let (out_tx, out_rx) = channel::bounded::<R>(workers);
    let (err_tx, err_rx) = channel::bounded::<CacheError>(workers);
    let failed = AtomicBool::new(false);

    thread::scope(|scope| {
        let collector = scope.spawn(move || out_rx.iter().collect::<Vec<R>>());

        for _ in 0..workers {
            let item_rx = item_rx.clone();
            let out_tx = out_tx.clone();
            let err_tx = err_tx.clone();
            let work = &work;
            let failed = &failed;
            scope.spawn(move || {
                for item in item_rx.iter() {
                    if failed.load(Ordering::Acquire) {
                        continue;
                    }
                    if let Err(e) = work(item, &out_tx) {
                        failed.store(true, Ordering::Release);
                        // Capacity equals the worker count, so this never blocks
                        let _ = err_tx.try_send(e);
                    }
                }
            });
        }
        drop(item_rx);
        drop(out_tx);
        drop(err_tx);

        let mut first_error = None;
        for item in items {
            select! {
                send(item_tx, item) -> sent => {
                    if sent.is_err() {
                        break;
                    }
                }
                recv(err_rx) -> err => {
                    first_error = err.ok();
                    break;
                }
            }
        }
        // Closing the queue lets idle workers exit their loop
        drop(item_tx);

        let outputs = match collector.join() {
            Ok(outputs) => outputs,
            Err(payload) => panic::resume_unwind(payload),
        };

        match first_error.or_else(|| err_rx.try_recv().ok()) {
            Some(e) => {
                tracing::debug!(pool = label, error = %e, "worker pool stopped early");
                Err(e)
            }
            None => Ok(outputs),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_collects_all_outputs() {
        let mut outputs = run("test", 4, 0..1000u32, |n, out| {
            out.send(n * 2).ok();
            Ok(())
        })
        .unwrap();
        outputs.sort_unstable();
        assert_eq!(outputs, (0..1000u32).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_workers_may_emit_many_outputs() {
        let outputs = run("test", 3, 0..10usize, |n, out| {
            for i in 0..n {
                out.send(i).ok();
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(outputs.len(), 45);
    }

    #[test]
    fn test_first_error_stops_distribution() {
        let processed = AtomicUsize::new(0);
        let result = run("test", 2, 0..100_000u32, |n, _out: &Sender<()>| {
            processed.fetch_add(1, Ordering::Relaxed);
            if n == 10 {
                return Err(CacheError::invalid_layout("/root/item-10", "boom"));
            }
            Ok(())
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("item-10"));
        assert!(processed.load(Ordering::Relaxed) < 100_000);
    }

    #[test]
    fn test_error_on_last_item_is_reported() {
        let result = run("test", 4, 0..8u32, |n, _out: &Sender<()>| {
            if n == 7 {
                return Err(CacheError::configuration("last"));
            }
            Ok(())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_input() {
        let outputs: Vec<u8> = run("test", 0, Vec::<u8>::new(), |_, _| Ok(())).unwrap();
        assert!(outputs.is_empty());
    }
}
