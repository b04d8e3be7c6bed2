//! Module Context - 현재 실행 중인 모듈 스택
//!
//! 모듈 부트스트랩이나 옵저버 실행 중에 "어느 모듈의 코드가 돌고 있는가"를 추적합니다.
//! 레지스트리와 이벤트 버스는 등록 시점의 `current()`를 `origin_module`로 기록합니다.
//! 진단용 정보일 뿐 접근 제어에는 쓰이지 않습니다.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// 모듈 컨텍스트 스택
#[derive(Debug, Default)]
pub struct ModuleStack {
    stack: Mutex<Vec<String>>,
}

impl ModuleStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모듈을 스택에 push
    ///
    /// 반환된 guard가 drop될 때 pop 됩니다.
    pub fn push(self: &Arc<Self>, name: impl Into<String>) -> ModuleGuard {
        let name = name.into();
        trace!(module = %name, "push module context");
        let depth = {
            let mut stack = self.stack.lock();
            stack.push(name);
            stack.len()
        };
        ModuleGuard {
            stack: Arc::clone(self),
            depth,
        }
    }

    /// 현재 활성 모듈 이름
    pub fn current(&self) -> Option<String> {
        self.stack.lock().last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.stack.lock().len()
    }

    pub fn clear(&self) {
        self.stack.lock().clear();
    }
}

/// `ModuleStack::push`가 반환하는 RAII guard
#[must_use = "the module is popped as soon as the guard is dropped"]
pub struct ModuleGuard {
    stack: Arc<ModuleStack>,
    depth: usize,
}

impl Drop for ModuleGuard {
    fn drop(&mut self) {
        let mut stack = self.stack.stack.lock();
        // 중첩 guard가 역순으로 drop되지 않아도 자기 깊이까지만 되돌림
        if stack.len() >= self.depth {
            stack.truncate(self.depth - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let stack = Arc::new(ModuleStack::new());
        assert_eq!(stack.current(), None);

        {
            let _outer = stack.push("Core");
            assert_eq!(stack.current().as_deref(), Some("Core"));
            {
                let _inner = stack.push("Blog");
                assert_eq!(stack.current().as_deref(), Some("Blog"));
                assert_eq!(stack.depth(), 2);
            }
            assert_eq!(stack.current().as_deref(), Some("Core"));
        }

        assert_eq!(stack.depth(), 0);
    }
}
