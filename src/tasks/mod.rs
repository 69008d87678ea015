pub mod result_observer;

pub use result_observer::{
    ObserverEvent, ObserverHandle, ObserverState, ResultObserver, TallySnapshot, TerminationReason,
};
