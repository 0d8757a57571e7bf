//! End-to-end exercises of the scenarios in §8 of the specification,
//! driven against the `std`-backed fakes in [`crate::host::test_support`]
//! with real OS threads standing in for the simulated kernel's cooperative
//! pager threads.

use std::sync::Arc;
use std::thread;

use crate::error::FaultOutcome;
use crate::host::test_support::{TestMailbox, TestMmu, TestProcessHost, TestSemaphore, TestSwapDisk};
use crate::host::{AccessBits, Cause};
use crate::lifecycle::{VmConfig, VmContext};
use crate::page_table::{FrameId, PageId, Pid};

const PAGE_SIZE: usize = 4096;

type Ctx = VmContext<Arc<TestMmu>, TestSwapDisk, TestMailbox<Pid>, TestProcessHost>;

/// Builds a context plus an independent handle to its simulated MMU, which
/// tests use to play the role of hardware setting the cause register
/// before each simulated trap.
fn build(pages: usize, frames: usize, pagers: usize, disk_blocks: usize) -> (Arc<Ctx>, Arc<TestMmu>) {
    let config = VmConfig::new(pages, pages, frames, pagers, disk_blocks).unwrap();
    let mmu = Arc::new(TestMmu::new(PAGE_SIZE, 0));
    let disk_bytes = disk_blocks * PAGE_SIZE;
    let ctx = VmContext::init(
        config,
        Arc::clone(&mmu),
        TestSwapDisk::new(512, 32, disk_bytes),
        TestMailbox::new(8),
        TestProcessHost::new(),
        Arc::new(TestSemaphore::new(0)),
        0,
    )
    .unwrap();
    (Arc::new(ctx), mmu)
}

fn spawn_pagers(ctx: &Arc<Ctx>, count: usize) -> Vec<thread::JoinHandle<()>> {
    (0..count)
        .map(|_| {
            let ctx = Arc::clone(ctx);
            thread::spawn(move || ctx.run_pager())
        })
        .collect()
}

/// Plays the part of the hardware trap: sets the simulated cause register,
/// then drives the fault handler as if the interrupt had just fired.
fn fault_at(ctx: &Ctx, mmu: &TestMmu, pid: Pid, page: usize) -> FaultOutcome {
    mmu.set_cause(Cause::Fault { addr: page * PAGE_SIZE });
    ctx.handle_fault(pid)
}

fn shutdown(ctx: &Arc<Ctx>, pagers: Vec<thread::JoinHandle<()>>) {
    ctx.destroy();
    for p in pagers {
        p.join().unwrap();
    }
}

fn resident_frame(ctx: &Ctx, pid: Pid, page: usize) -> FrameId {
    let procs = ctx.processes.lock();
    procs
        .get(&pid)
        .unwrap()
        .page_table
        .get(PageId(page))
        .frame
        .expect("page expected resident")
}

/// S1: single process, one page, one frame.
#[test]
fn s1_single_process_one_page_one_frame() {
    let (ctx, mmu) = build(1, 1, 1, 1);
    let pagers = spawn_pagers(&ctx, 1);
    ctx.on_fork(Pid(1), Arc::new(TestSemaphore::new(0)));

    assert_eq!(fault_at(&ctx, &mmu, Pid(1), 0), FaultOutcome::Resolved);

    let snap = ctx.stats();
    assert_eq!(snap.faults, 1);
    assert_eq!(snap.new, 1);
    assert_eq!(snap.page_ins, 0);
    assert_eq!(snap.page_outs, 0);
    resident_frame(&ctx, Pid(1), 0);

    ctx.on_quit(Pid(1));
    let snap = ctx.stats();
    assert_eq!(snap.page_ins, 0);
    assert_eq!(snap.page_outs, 0);
    assert_eq!(ctx.frames.lock().free_count(), 1);

    shutdown(&ctx, pagers);
}

/// S2: forced eviction of a clean page leaves no trace on swap.
#[test]
fn s2_forced_eviction_clean_page() {
    let (ctx, mmu) = build(2, 1, 1, 1);
    let pagers = spawn_pagers(&ctx, 1);
    ctx.on_fork(Pid(1), Arc::new(TestSemaphore::new(0)));

    assert_eq!(fault_at(&ctx, &mmu, Pid(1), 0), FaultOutcome::Resolved);
    assert_eq!(fault_at(&ctx, &mmu, Pid(1), 1), FaultOutcome::Resolved);

    let snap = ctx.stats();
    assert_eq!(snap.faults, 2);
    assert_eq!(snap.new, 2);
    assert_eq!(snap.page_outs, 0, "page 0 was never written, so eviction is clean");

    assert_eq!(fault_at(&ctx, &mmu, Pid(1), 0), FaultOutcome::Resolved);
    let snap = ctx.stats();
    assert_eq!(snap.faults, 3);
    assert_eq!(snap.new, 2, "re-fault of an already-seen page is not new");
    assert_eq!(snap.page_ins, 0, "page 0 had no disk block to read back");
    assert_eq!(snap.page_outs, 0);

    shutdown(&ctx, pagers);
}

/// S3: a dirty eviction writes to swap, and the content survives a
/// subsequent page-in.
#[test]
fn s3_dirty_eviction_round_trips_content() {
    let (ctx, mmu) = build(2, 1, 1, 4);
    let pagers = spawn_pagers(&ctx, 1);
    ctx.on_fork(Pid(1), Arc::new(TestSemaphore::new(0)));

    assert_eq!(fault_at(&ctx, &mmu, Pid(1), 0), FaultOutcome::Resolved);
    let frame0 = resident_frame(&ctx, Pid(1), 0);

    let pattern = [0xCDu8; PAGE_SIZE];
    ctx.mmu.write_frame(frame0, &pattern);
    ctx.mmu.set_access(frame0, AccessBits::DIRTY);

    assert_eq!(fault_at(&ctx, &mmu, Pid(1), 1), FaultOutcome::Resolved);
    assert_eq!(ctx.stats().page_outs, 1);
    {
        let procs = ctx.processes.lock();
        let pte = procs.get(&Pid(1)).unwrap().page_table.get(PageId(0));
        assert!(pte.disk_block.is_some());
    }

    assert_eq!(fault_at(&ctx, &mmu, Pid(1), 0), FaultOutcome::Resolved);
    assert_eq!(ctx.stats().page_ins, 1);

    let frame_again = resident_frame(&ctx, Pid(1), 0);
    let mut out = [0u8; PAGE_SIZE];
    ctx.mmu.read_frame(frame_again, &mut out);
    assert_eq!(&out[..], &pattern[..]);

    shutdown(&ctx, pagers);
}

/// S4: swap exhaustion terminates the unlucky faulter, not the kernel, and
/// leaves other processes intact.
#[test]
fn s4_swap_exhaustion_terminates_faulter_only() {
    let (ctx, mmu) = build(1, 1, 1, 1);
    let pagers = spawn_pagers(&ctx, 1);

    ctx.on_fork(Pid(1), Arc::new(TestSemaphore::new(0)));
    ctx.on_fork(Pid(2), Arc::new(TestSemaphore::new(0)));
    ctx.on_fork(Pid(3), Arc::new(TestSemaphore::new(0)));

    assert_eq!(fault_at(&ctx, &mmu, Pid(1), 0), FaultOutcome::Resolved);
    let frame_a = resident_frame(&ctx, Pid(1), 0);
    ctx.mmu.set_access(frame_a, AccessBits::DIRTY);

    // Evicts A (consumes the disk's only block).
    assert_eq!(fault_at(&ctx, &mmu, Pid(2), 0), FaultOutcome::Resolved);
    let frame_b = resident_frame(&ctx, Pid(2), 0);
    ctx.mmu.set_access(frame_b, AccessBits::DIRTY);

    // No blocks left: evicting B to satisfy C must terminate C.
    assert_eq!(fault_at(&ctx, &mmu, Pid(3), 0), FaultOutcome::Terminate);

    let terminated = ctx.process_host.terminated.lock().unwrap().clone();
    assert_eq!(terminated, std::vec![(Pid(3), 1)]);

    // A and B are undisturbed; their own fault cycles already completed.
    let procs = ctx.processes.lock();
    assert!(procs.get(&Pid(1)).is_some());
    assert!(procs.get(&Pid(2)).is_some());
    drop(procs);

    shutdown(&ctx, pagers);
}

/// S5: context switch tears down and restores exactly the switched
/// process's mappings, never both at once.
#[test]
fn s5_context_switch_isolates_mappings() {
    let (ctx, mmu) = build(1, 2, 1, 2);
    let pagers = spawn_pagers(&ctx, 1);

    ctx.on_fork(Pid(1), Arc::new(TestSemaphore::new(0)));
    ctx.on_fork(Pid(2), Arc::new(TestSemaphore::new(0)));

    assert_eq!(fault_at(&ctx, &mmu, Pid(1), 0), FaultOutcome::Resolved);
    assert_eq!(fault_at(&ctx, &mmu, Pid(2), 0), FaultOutcome::Resolved);

    ctx.on_switch_out(Pid(2));
    assert_eq!(ctx.mmu.get_map(ctx.tag, PageId(0)), None, "no TAG mapping during the gap (I4)");

    ctx.on_switch_in(Pid(1));
    let frame1 = resident_frame(&ctx, Pid(1), 0);
    assert_eq!(ctx.mmu.get_map(ctx.tag, PageId(0)), Some((frame1, crate::host::Prot::RW)));

    ctx.on_switch_out(Pid(1));
    assert_eq!(ctx.mmu.get_map(ctx.tag, PageId(0)), None);

    ctx.on_switch_in(Pid(2));
    let frame2 = resident_frame(&ctx, Pid(2), 0);
    assert_eq!(ctx.mmu.get_map(ctx.tag, PageId(0)), Some((frame2, crate::host::Prot::RW)));
    assert_eq!(ctx.stats().switches, 2);

    shutdown(&ctx, pagers);
}

/// S6: multiple pagers servicing multiple concurrently faulting processes
/// never doubly assign a frame, and every fault cycle completes.
#[test]
fn s6_multi_pager_concurrency() {
    let (ctx, mmu) = build(8, 4, 2, 16);
    let pagers = spawn_pagers(&ctx, 2);

    let faulters: Vec<_> = (1..=4)
        .map(|n| {
            let ctx = Arc::clone(&ctx);
            let mmu = Arc::clone(&mmu);
            let pid = Pid(n);
            ctx.on_fork(pid, Arc::new(TestSemaphore::new(0)));
            thread::spawn(move || {
                let first = fault_at(&ctx, &mmu, pid, 0);
                let second = fault_at(&ctx, &mmu, pid, 1);
                (first, second)
            })
        })
        .collect();

    for f in faulters {
        let (a, b) = f.join().unwrap();
        assert_eq!(a, FaultOutcome::Resolved);
        assert_eq!(b, FaultOutcome::Resolved);
    }

    // Quiescence: every occupied frame cross-checks with its claimed PTE
    // (I1/I2), and no two frames claim the same (pid, page).
    let procs = ctx.processes.lock();
    let frames = ctx.frames.lock();
    let mut seen = std::collections::HashSet::new();
    for idx in 0..frames.len() {
        let frame = FrameId(idx);
        let rec = frames.get(frame);
        if let (Some(page), Some(pid)) = (rec.page, rec.pid) {
            assert!(seen.insert((pid, page)), "frame double-assigned to {pid:?}/{page:?}");
            let pte = procs.get(&pid).unwrap().page_table.get(page);
            assert_eq!(pte.frame, Some(frame));
        }
    }
    drop(frames);
    drop(procs);

    shutdown(&ctx, pagers);
}
