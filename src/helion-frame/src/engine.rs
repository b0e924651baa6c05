//! The execution engine: graph ownership, slot assignment and the event
//! loop.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use common_display::{DisplayTree, TreeNode};
use common_error::{HelionError, HelionResult};
use helion_storage::{EventTable, RowRange};

use crate::node::{ActionExec, DefineLike, FilterLike};
use crate::report::CutflowReport;
use crate::result::ResultHandle;

/// Booked nodes, in booking order, plus outstanding readiness flags.
#[derive(Default)]
struct Books {
    filters: Vec<Arc<dyn FilterLike>>,
    defines: Vec<Arc<dyn DefineLike>>,
    define_names: HashMap<String, Arc<dyn DefineLike>>,
    actions: Vec<Arc<dyn ActionExec>>,
    readiness: Vec<Arc<AtomicBool>>,
}

/// Owner of the computation graph and driver of the one-shot event loop.
///
/// The engine assigns slots, iterates the input partitioned across workers
/// and dispatches per-row work to the booked actions. It is reached only
/// through [`crate::EventFrame`] and the weak references held by result
/// handles.
pub(crate) struct EngineCore {
    table: Arc<dyn EventTable>,
    default_columns: Vec<String>,
    n_slots: usize,
    books: Mutex<Books>,
    run_guard: Mutex<()>,
    has_run: AtomicBool,
}

impl EngineCore {
    pub fn new(table: Arc<dyn EventTable>, default_columns: Vec<String>, n_slots: usize) -> Self {
        Self {
            table,
            default_columns,
            n_slots: n_slots.max(1),
            books: Mutex::new(Books::default()),
            run_guard: Mutex::new(()),
            has_run: AtomicBool::new(false),
        }
    }

    pub fn table(&self) -> &Arc<dyn EventTable> {
        &self.table
    }

    pub fn default_columns(&self) -> &[String] {
        &self.default_columns
    }

    pub fn n_slots(&self) -> usize {
        self.n_slots
    }

    pub fn has_run(&self) -> bool {
        self.has_run.load(Ordering::Acquire)
    }

    fn books(&self) -> std::sync::MutexGuard<'_, Books> {
        self.books.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn book_filter(&self, filter: Arc<dyn FilterLike>) {
        self.books().filters.push(filter);
    }

    pub fn book_define(&self, define: Arc<dyn DefineLike>) -> HelionResult<()> {
        let mut books = self.books();
        let name = define.name().to_string();
        if books.define_names.contains_key(&name) {
            return Err(HelionError::DuplicateColumn(format!(
                "derived column '{name}' is already defined"
            )));
        }
        books.define_names.insert(name, Arc::clone(&define));
        books.defines.push(define);
        Ok(())
    }

    pub fn book_action(&self, action: Arc<dyn ActionExec>) {
        self.books().actions.push(action);
    }

    pub fn define_by_name(&self, name: &str) -> Option<Arc<dyn DefineLike>> {
        self.books().define_names.get(name).cloned()
    }

    pub fn has_define(&self, name: &str) -> bool {
        self.books().define_names.contains_key(name)
    }

    /// Create a lazy handle bound to this engine and register its readiness
    /// flag.
    pub fn make_handle<T: Send + 'static>(
        engine: &Arc<Self>,
        value: Arc<Mutex<T>>,
    ) -> ResultHandle<T> {
        let ready = Arc::new(AtomicBool::new(false));
        engine.books().readiness.push(Arc::clone(&ready));
        ResultHandle::new(ready, value, Arc::downgrade(engine))
    }

    /// Execute the event loop: initialize per-slot state, iterate the input
    /// partitioned across slots, then merge per-slot partials and raise
    /// every outstanding readiness flag.
    ///
    /// Later calls re-execute the full pass and re-raise the flags. A
    /// failure on any slot aborts the pass, releases per-slot state and
    /// leaves every handle not-ready.
    pub fn run(&self) -> HelionResult<()> {
        let _running = self.run_guard.lock().unwrap_or_else(PoisonError::into_inner);

        let (filters, defines, actions, readiness) = {
            let books = self.books();
            (
                books.filters.clone(),
                books.defines.clone(),
                books.actions.clone(),
                books.readiness.clone(),
            )
        };

        let outcome = self.run_pass(&filters, &defines, &actions);

        for filter in &filters {
            filter.release_slots();
        }
        for define in &defines {
            define.release_slots();
        }
        for action in &actions {
            action.release_slots();
        }

        outcome?;

        for flag in &readiness {
            flag.store(true, Ordering::Release);
        }
        self.has_run.store(true, Ordering::Release);
        Ok(())
    }

    fn run_pass(
        &self,
        filters: &[Arc<dyn FilterLike>],
        defines: &[Arc<dyn DefineLike>],
        actions: &[Arc<dyn ActionExec>],
    ) -> HelionResult<()> {
        let table = self.table.as_ref();
        for filter in filters {
            filter.init_slots(table, self.n_slots)?;
        }
        for define in defines {
            define.init_slots(table, self.n_slots)?;
        }
        for action in actions {
            action.init_slots(table, self.n_slots)?;
        }

        let ranges = self.table.partitions(self.n_slots);
        if ranges.len() > self.n_slots {
            return Err(HelionError::storage(format!(
                "provider returned {} partitions for {} slots",
                ranges.len(),
                self.n_slots
            )));
        }

        if self.n_slots == 1 {
            for range in ranges {
                process_range(0, range, actions)?;
            }
        } else {
            std::thread::scope(|scope| {
                let mut workers = Vec::with_capacity(ranges.len());
                for (slot, range) in ranges.into_iter().enumerate() {
                    workers.push(scope.spawn(move || process_range(slot, range, actions)));
                }

                let mut first_error = None;
                for worker in workers {
                    let result = worker.join().unwrap_or_else(|_| {
                        Err(HelionError::execution("worker thread panicked"))
                    });
                    if let Err(e) = result {
                        first_error.get_or_insert(e);
                    }
                }
                match first_error {
                    None => Ok(()),
                    Some(e) => Err(e),
                }
            })?;
        }

        // Merge per-slot partials into the published aggregates, on this
        // thread, in booking order.
        for action in actions {
            action.finalize()?;
        }
        Ok(())
    }

    /// Fail with `NotYetRun` if no run has completed.
    pub fn check_has_run(&self) -> HelionResult<()> {
        if !self.has_run() {
            return Err(HelionError::NotYetRun(
                "the event loop has not been run yet; the report would be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Stats for every named filter in the graph, in booking order.
    pub fn report_all(&self) -> HelionResult<CutflowReport> {
        self.check_has_run()?;
        let stats = self.books().filters.iter().filter_map(|f| f.stats()).collect();
        Ok(CutflowReport::new(stats))
    }

    /// Render the booked graph as a tree.
    pub fn explain(&self) -> String {
        struct GraphNode {
            label: String,
            children: Vec<GraphNode>,
        }

        impl TreeNode for GraphNode {
            fn name(&self) -> &str {
                &self.label
            }

            fn children(&self) -> Vec<&dyn TreeNode> {
                self.children.iter().map(|c| c as &dyn TreeNode).collect()
            }
        }

        struct Entry {
            parent: usize,
            key: Option<usize>,
            label: String,
        }

        fn build(parent: usize, entries: &[Entry]) -> Vec<GraphNode> {
            entries
                .iter()
                .filter(|e| e.parent == parent)
                .map(|e| GraphNode {
                    label: e.label.clone(),
                    children: e.key.map_or_else(Vec::new, |key| build(key, entries)),
                })
                .collect()
        }

        let mut entries = Vec::new();
        {
            let books = self.books();
            for filter in &books.filters {
                entries.push(Entry {
                    parent: filter.parent().key(),
                    key: Some(Arc::as_ptr(filter) as *const () as usize),
                    label: filter.describe(),
                });
            }
            for define in &books.defines {
                entries.push(Entry {
                    parent: define.parent().key(),
                    key: Some(Arc::as_ptr(define) as *const () as usize),
                    label: define.describe(),
                });
            }
            for action in &books.actions {
                entries.push(Entry {
                    parent: action.parent().key(),
                    key: None,
                    label: action.label(),
                });
            }
        }

        let root = GraphNode {
            label: format!("{} ({} rows)", self.table.name(), self.table.row_count()),
            children: build(0, &entries),
        };
        DisplayTree::new(&root).to_string()
    }
}

/// Process one slot's row range: every booked action sees every row, in
/// ascending row order. A panicking user callable is caught here and
/// surfaced as an `ExecutionError`.
fn process_range(slot: usize, range: RowRange, actions: &[Arc<dyn ActionExec>]) -> HelionResult<()> {
    let body = || -> HelionResult<()> {
        for row in range.start..range.end {
            for action in actions {
                action.run(slot, row)?;
            }
        }
        Ok(())
    };
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => Err(HelionError::execution(format!(
            "user callable panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
