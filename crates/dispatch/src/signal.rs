//! 자식 프로세스 그룹 종료

use std::io;

/// 프로세스 그룹 전체에 시그널을 보냅니다.
///
/// 대상 자식은 `process_group(0)`으로 생성되어 자신의 pid 가 그룹 id 입니다.
pub(crate) fn kill_group(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: killpg 는 포인터를 받지 않으며, 잘못된 그룹이면 에러 코드만 반환합니다.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
