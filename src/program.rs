//! Resumable routines: userland programs expressed as `async fn`s that
//! `.await` syscalls, driven by manually polling a boxed future once per
//! kernel resume (§9, "Resumable routines").
//!
//! Built on the same two ideas as a hand-rolled `syscall::{PollFn, poll_fn}`
//! (a `Future` used to retry a syscall handler on every poll until ready)
//! paired with an `executor::waker::TaskWaker`-style `Wake` impl that
//! re-enqueues a task id. Both are reused here, but generalized: instead of
//! polling hardware state, each poll either returns an already-available
//! result or records a *request* for the scheduler to see; instead of
//! waking a real task queue, the waker is a no-op, because the scheduler
//! alone decides when the next poll happens (§5) — there is no other
//! source of wakeups to honour.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use crate::port::PortId;
use crate::process::{OpenMode, Pid};
use crate::value::Value;

/// Which [`crate::kernel::Kernel::kernel_info`] snapshot a `KINFO` syscall asks for (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KInfoKind {
    Ps,
    Ports,
    Vfs,
}

/// A tagged syscall request yielded by a routine (§6, "Syscall surface").
/// Discriminated by variant rather than a `type` string field, the natural
/// Rust rendition of the source's tagged records.
#[derive(Debug, Clone)]
pub enum SyscallRequest {
    Sleep { ms: u64 },
    GetPid,
    Log { message: String },
    Exit { code: i32 },
    Send { to: Pid, message: Value },
    Recv { from: Option<Pid> },
    Open { path: String, mode: OpenMode },
    Read { fd: i32, n: Option<usize> },
    Write { fd: i32, data: Vec<u8> },
    Close { fd: i32 },
    Exec { program: String, args: Vec<Value> },
    HeapSet { key: String, value: Value },
    HeapGet { key: String },
    Listen { port: PortId },
    Unlisten { port: PortId },
    SendPort { port: PortId, payload: Value },
    RecvPort { port: PortId, timeout_ms: Option<u64> },
    Spawn { program: String, name: Option<String>, priority: i32, args: Vec<Value> },
    KernelInfo { kind: KInfoKind },
    ListFiles,
    ReadFile { path: String },
    WriteFile { path: String, text: String },
    Unlink { path: String },
    ListPorts,
    Kill { target: Pid, signal: i32 },
}

/// The shared handoff point between a routine's syscall futures and the
/// driver that polls the routine. At most one request is ever pending at a
/// time, matching the "resume with a value, observe the next request" contract.
#[derive(Default)]
struct Channel {
    pending_request: Option<SyscallRequest>,
    resume_value: Option<Value>,
}

/// The syscall surface handed to a program factory: every method returns a
/// future that, awaited, suspends the routine until the kernel resumes it
/// with a result.
#[derive(Clone)]
pub struct Syscalls {
    pid: Pid,
    channel: Rc<RefCell<Channel>>,
}

impl Syscalls {
    fn new(pid: Pid) -> (Self, Rc<RefCell<Channel>>) {
        let channel = Rc::new(RefCell::new(Channel::default()));
        (
            Self {
                pid,
                channel: channel.clone(),
            },
            channel,
        )
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    fn call(&self, request: SyscallRequest) -> SyscallFuture {
        SyscallFuture {
            channel: self.channel.clone(),
            request: Some(request),
        }
    }

    pub fn sleep(&self, ms: u64) -> SyscallFuture {
        self.call(SyscallRequest::Sleep { ms })
    }

    pub fn get_pid(&self) -> SyscallFuture {
        self.call(SyscallRequest::GetPid)
    }

    pub fn log(&self, message: impl Into<String>) -> SyscallFuture {
        self.call(SyscallRequest::Log {
            message: message.into(),
        })
    }

    pub fn exit(&self, code: i32) -> SyscallFuture {
        self.call(SyscallRequest::Exit { code })
    }

    pub fn send(&self, to: Pid, message: Value) -> SyscallFuture {
        self.call(SyscallRequest::Send { to, message })
    }

    pub fn recv(&self, from: Option<Pid>) -> SyscallFuture {
        self.call(SyscallRequest::Recv { from })
    }

    pub fn open(&self, path: impl Into<String>, mode: OpenMode) -> SyscallFuture {
        self.call(SyscallRequest::Open {
            path: path.into(),
            mode,
        })
    }

    pub fn read(&self, fd: i32, n: Option<usize>) -> SyscallFuture {
        self.call(SyscallRequest::Read { fd, n })
    }

    pub fn write(&self, fd: i32, data: impl Into<Vec<u8>>) -> SyscallFuture {
        self.call(SyscallRequest::Write {
            fd,
            data: data.into(),
        })
    }

    pub fn close(&self, fd: i32) -> SyscallFuture {
        self.call(SyscallRequest::Close { fd })
    }

    pub fn exec(&self, program: impl Into<String>, args: Vec<Value>) -> SyscallFuture {
        self.call(SyscallRequest::Exec {
            program: program.into(),
            args,
        })
    }

    pub fn heap_set(&self, key: impl Into<String>, value: Value) -> SyscallFuture {
        self.call(SyscallRequest::HeapSet {
            key: key.into(),
            value,
        })
    }

    pub fn heap_get(&self, key: impl Into<String>) -> SyscallFuture {
        self.call(SyscallRequest::HeapGet { key: key.into() })
    }

    pub fn listen(&self, port: PortId) -> SyscallFuture {
        self.call(SyscallRequest::Listen { port })
    }

    pub fn unlisten(&self, port: PortId) -> SyscallFuture {
        self.call(SyscallRequest::Unlisten { port })
    }

    pub fn send_to_port(&self, port: PortId, payload: Value) -> SyscallFuture {
        self.call(SyscallRequest::SendPort { port, payload })
    }

    pub fn recv_from_port(&self, port: PortId, timeout_ms: Option<u64>) -> SyscallFuture {
        self.call(SyscallRequest::RecvPort { port, timeout_ms })
    }

    pub fn spawn(
        &self,
        program: impl Into<String>,
        name: Option<String>,
        priority: i32,
        args: Vec<Value>,
    ) -> SyscallFuture {
        self.call(SyscallRequest::Spawn {
            program: program.into(),
            name,
            priority,
            args,
        })
    }

    pub fn kernel_info(&self, kind: KInfoKind) -> SyscallFuture {
        self.call(SyscallRequest::KernelInfo { kind })
    }

    pub fn list_files(&self) -> SyscallFuture {
        self.call(SyscallRequest::ListFiles)
    }

    pub fn read_file(&self, path: impl Into<String>) -> SyscallFuture {
        self.call(SyscallRequest::ReadFile { path: path.into() })
    }

    pub fn write_file(&self, path: impl Into<String>, text: impl Into<String>) -> SyscallFuture {
        self.call(SyscallRequest::WriteFile {
            path: path.into(),
            text: text.into(),
        })
    }

    pub fn unlink(&self, path: impl Into<String>) -> SyscallFuture {
        self.call(SyscallRequest::Unlink { path: path.into() })
    }

    pub fn list_ports(&self) -> SyscallFuture {
        self.call(SyscallRequest::ListPorts)
    }

    pub fn kill(&self, target: Pid, signal: i32) -> SyscallFuture {
        self.call(SyscallRequest::Kill { target, signal })
    }
}

/// The future returned by every [`Syscalls`] method. Polled once per kernel
/// resume: if a result has already been deposited by the driver, it resolves
/// immediately; otherwise it records its request in the shared channel and
/// reports `Pending`.
pub struct SyscallFuture {
    channel: Rc<RefCell<Channel>>,
    request: Option<SyscallRequest>,
}

impl Future for SyscallFuture {
    type Output = Value;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Value> {
        let this = self.get_mut();
        let mut channel = this.channel.borrow_mut();
        if let Some(value) = channel.resume_value.take() {
            return Poll::Ready(value);
        }
        if let Some(request) = this.request.take() {
            channel.pending_request = Some(request);
        }
        Poll::Pending
    }
}

/// A no-op waker: the scheduler is the sole driver of progress, so there is
/// nothing for a real wakeup to do (§5).
struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
    fn wake_by_ref(self: &Arc<Self>) {}
}

fn noop_waker() -> Waker {
    Waker::from(Arc::new(NoopWake))
}

/// The outcome of stepping a routine once (§9: `step(input) -> Yield | Done | Crashed`).
pub enum RoutineStep {
    /// The routine yielded a syscall request.
    Yield(SyscallRequest),
    /// The routine's future was pending with no recognizable request attached
    /// — a cooperative no-op yield (§4.1 step 5). Routines built on
    /// [`Syscalls`] never produce this; it exists for hand-written routines
    /// that `.await` a bare `std::future::pending`-style yield point.
    Idle,
    /// The routine completed, producing a final exit code.
    Done(i32),
    /// The routine's future panicked while being polled.
    Crashed(String),
}

/// A resumable userland routine: a boxed, pinned future plus the channel used
/// to hand results in and requests out.
pub struct Routine {
    future: Pin<Box<dyn Future<Output = i32>>>,
    channel: Rc<RefCell<Channel>>,
    /// Whether this routine has been polled at least once. The very first
    /// poll has no previous syscall to report a result for — the routine is
    /// running fresh up to its first yield point — so `step`'s `input` must
    /// not be injected as a resume value on that call, or the first syscall
    /// a routine ever issues would see a stale "result" and be treated as
    /// already complete instead of being dispatched at all.
    started: bool,
}

impl Routine {
    /// Resume the routine, injecting `input` as the return value of the
    /// previous syscall (skipped on the very first call, see `started`), and
    /// observe what it does next.
    pub fn step(&mut self, input: Value) -> RoutineStep {
        if self.started {
            self.channel.borrow_mut().resume_value = Some(input);
        }
        self.started = true;
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        let poll_result = catch_unwind(AssertUnwindSafe(|| self.future.as_mut().poll(&mut cx)));
        match poll_result {
            Err(payload) => RoutineStep::Crashed(panic_message(payload)),
            Ok(Poll::Ready(code)) => RoutineStep::Done(code),
            Ok(Poll::Pending) => match self.channel.borrow_mut().pending_request.take() {
                Some(request) => RoutineStep::Yield(request),
                None => RoutineStep::Idle,
            },
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A program factory: given the syscall surface bound to a pid and the
/// arguments passed to `spawn`, produces the routine instance (§4.7).
pub type ProgramFactory = Rc<dyn Fn(Syscalls, Vec<Value>) -> Pin<Box<dyn Future<Output = i32>>>>;

/// Maps program name -> factory (§2, "Program Registry").
#[derive(Clone, Default)]
pub struct ProgramRegistry {
    programs: std::collections::HashMap<String, ProgramFactory>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: ProgramFactory) {
        self.programs.insert(name.into(), factory);
    }

    pub fn get(&self, name: &str) -> Option<ProgramFactory> {
        self.programs.get(name).cloned()
    }

    /// Instantiate a routine for `program_name`, binding the syscall surface
    /// to `pid`. Returns `None` if the program is not registered.
    pub fn instantiate(&self, name: &str, pid: Pid, args: Vec<Value>) -> Option<Routine> {
        let factory = self.get(name)?;
        let (syscalls, channel) = Syscalls::new(pid);
        let future = factory(syscalls, args);
        Some(Routine {
            future,
            channel,
            started: false,
        })
    }
}

impl fmt::Debug for ProgramRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramRegistry")
            .field("programs", &self.programs.keys().collect::<Vec<_>>())
            .finish()
    }
}
