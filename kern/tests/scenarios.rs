//! Integration tests against the public `Kernel` API, one per concrete
//! scenario. These drive the scheduler, SRR engine, and event bridge the way
//! a real trap sequence would -- by calling the same `Kernel` methods
//! `syscalls::dispatch` calls -- without executing any real task code, since
//! `arch::sim` has none to execute.

use abi::event;
use kern::kernel::Kernel;
use kern::task::Priority;

fn noop() -> ! {
    loop {}
}

fn priority(p: i32) -> Priority {
    Priority::new(p).unwrap()
}

#[test]
fn priority_preemption_runs_higher_priority_first_regardless_of_creation_order() {
    let mut k: Kernel<8, 8> = Kernel::new();
    let a = k.create(priority(1), None, noop).unwrap();
    let b = k.create(priority(2), None, noop).unwrap();
    assert_eq!(k.schedule(), b, "higher priority runs first");
    assert_eq!(k.schedule(), a);

    let mut k: Kernel<8, 8> = Kernel::new();
    let b = k.create(priority(2), None, noop).unwrap();
    let a = k.create(priority(1), None, noop).unwrap();
    assert_eq!(k.schedule(), b, "creation order doesn't matter, only priority");
    assert_eq!(k.schedule(), a);
}

#[test]
fn fifo_within_priority_preserves_creation_order() {
    let mut k: Kernel<8, 8> = Kernel::new();
    let t1 = k.create(priority(1), None, noop).unwrap();
    let t2 = k.create(priority(1), None, noop).unwrap();
    let t3 = k.create(priority(1), None, noop).unwrap();
    let t4 = k.create(priority(1), None, noop).unwrap();
    assert_eq!(k.schedule(), t1);
    assert_eq!(k.schedule(), t2);
    assert_eq!(k.schedule(), t3);
    assert_eq!(k.schedule(), t4);
}

#[test]
fn rendezvous_ordering_is_queue_order_not_priority() {
    let mut k: Kernel<8, 8> = Kernel::new();
    let r = k.create(priority(2), None, noop).unwrap();
    let s1 = k.create(priority(3), None, noop).unwrap();
    let s2 = k.create(priority(5), None, noop).unwrap();
    // Drain all three out of the ready queue, as if each had already run up
    // to its first trap.
    k.schedule();
    k.schedule();
    k.schedule();

    let msg_x = *b"x";
    let msg_y = *b"y";
    let mut reply_x = [0u8; 1];
    let mut reply_y = [0u8; 1];
    // Neither sender is S2's higher priority saves it a place in line: R
    // hasn't called Receive yet, so both simply queue in send order.
    k.send(s1, r, msg_x.as_ptr() as usize, 1, reply_x.as_mut_ptr() as usize, 1)
        .unwrap();
    k.send(s2, r, msg_y.as_ptr() as usize, 1, reply_y.as_mut_ptr() as usize, 1)
        .unwrap();

    let mut out_tid = 0u32;
    let mut recv_buf = [0u8; 1];
    let n = k
        .receive(r, &mut out_tid as *mut u32 as usize, recv_buf.as_mut_ptr() as usize, 1)
        .expect("S1 was already queued");
    assert_eq!(n, 1);
    assert_eq!(out_tid, s1.index() as u32);
    assert_eq!(&recv_buf, b"x");

    let n = k
        .receive(r, &mut out_tid as *mut u32 as usize, recv_buf.as_mut_ptr() as usize, 1)
        .expect("S2 was queued next");
    assert_eq!(n, 1);
    assert_eq!(out_tid, s2.index() as u32);
    assert_eq!(&recv_buf, b"y");
}

#[test]
fn send_to_a_task_that_exits_before_replying_wakes_the_sender_with_dead() {
    let mut k: Kernel<8, 8> = Kernel::new();
    // FirstUserTask (priority 4) creates R (priority 3); R is lower priority
    // so it stays Ready while FirstUserTask keeps running and immediately
    // Sends to it.
    let first_user_task = k.create(priority(4), None, noop).unwrap();
    let r = k.create(priority(3), None, noop).unwrap();
    k.schedule(); // drain first_user_task, as if it's the one now running

    let msg = *b"hello";
    k.send(first_user_task, r, msg.as_ptr() as usize, msg.len(), 0, 0)
        .unwrap();

    // R is still Ready, never having called Receive -- the send just queued.
    assert_eq!(
        k.task(first_user_task).unwrap().state,
        kern::task::TaskState::SendWait {
            callee: r,
            msg_ptr: msg.as_ptr() as usize,
            msg_len: msg.len(),
            reply_ptr: 0,
            reply_cap: 0,
            next_in_queue: None,
        }
    );

    // R now runs and its body returns immediately, i.e. an implicit Exit.
    k.exit(r);

    assert_eq!(
        k.task(first_user_task).unwrap().save.ret0() as i32,
        abi::ret::DEAD
    );
}

#[test]
fn await_event_then_matching_interrupt_resumes_with_payload() {
    let mut k: Kernel<8, 8> = Kernel::new();
    let t = k.create(priority(1), None, noop).unwrap();
    k.schedule();
    k.await_event(t, event::TICK).unwrap();
    assert_eq!(k.handle_interrupt(event::TICK, 0), Some(t));
    assert_eq!(k.task(t).unwrap().save.ret0(), 0);
}

#[test]
#[should_panic(expected = "already has a waiter")]
fn a_second_waiter_on_the_same_event_is_a_kernel_panic() {
    let mut k: Kernel<8, 8> = Kernel::new();
    let t1 = k.create(priority(1), None, noop).unwrap();
    let t2 = k.create(priority(1), None, noop).unwrap();
    k.schedule();
    k.schedule();
    k.await_event(t1, event::TICK).unwrap();
    k.await_event(t2, event::TICK).unwrap();
}

#[test]
fn shutdown_condition_waits_for_the_event_waiter_to_exit() {
    let mut k: Kernel<8, 8> = Kernel::new();
    let idle = k.create_idle(noop);
    k.set_idle(idle);
    let waiter = k.create(priority(1), None, noop).unwrap();
    k.schedule(); // drain waiter, as if it's now running
    k.await_event(waiter, event::TICK).unwrap();

    // Only idle is ready, but a task is still waiting on an event -- not yet
    // a shutdown condition.
    assert_eq!(k.schedule(), idle);
    assert_eq!(k.num_event_waiters(), 1);

    // The tick fires, waking the waiter, which runs to completion (an
    // implicit Exit) without ever awaiting anything else.
    k.handle_interrupt(event::TICK, 0);
    assert_eq!(k.num_event_waiters(), 0);
    assert_eq!(k.schedule(), waiter); // drain it, as if it's now running
    k.exit(waiter);

    // Now only idle is runnable and nothing could ever wake the system
    // again: this is exactly the condition `startup::run` checks before
    // returning to the boot monitor.
    assert_eq!(k.schedule(), idle);
    assert_eq!(k.num_event_waiters(), 0);
}
