//! Memcached cache backend
//!
//! memcached 텍스트 프로토콜(get/set/delete/flush_all)을 직접 구현합니다.
//! 사용 가능 여부는 첫 `info()` 호출 때 한 번만 접속을 시도해 결정합니다.

use super::backend::{BackendInfo, CacheBackend, DeletePattern, RANK_MEMCACHE};
use super::config::MemcacheConfig;
use super::util::{now_micros, MICROS_PER_SEC};
use crate::{Error, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const IO_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_KEY_LEN: usize = 250;
/// 이보다 큰 exptime은 memcached가 절대 Unix 시각으로 해석 (30일)
const MAX_RELATIVE_EXPTIME: u64 = 30 * 24 * 60 * 60;
/// memcached 기본 아이템 크기 제한
const MAX_ITEM_SIZE: usize = 1024 * 1024;

/// Memcached 백엔드
pub struct MemcacheBackend {
    config: MemcacheConfig,
    conn: Mutex<Option<BufReader<TcpStream>>>,
    available: OnceLock<bool>,
}

impl MemcacheBackend {
    pub fn new(config: &MemcacheConfig) -> Self {
        if config.compress {
            warn!("memcache compression is not supported, storing payloads uncompressed");
        }
        Self {
            config: config.clone(),
            conn: Mutex::new(None),
            available: OnceLock::new(),
        }
    }

    fn addr(&self) -> Result<SocketAddr> {
        (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                Error::Cache(format!(
                    "Cannot resolve memcache host {}:{}",
                    self.config.host, self.config.port
                ))
            })
    }

    fn connect(&self) -> Result<BufReader<TcpStream>> {
        let stream = TcpStream::connect_timeout(&self.addr()?, CONNECT_TIMEOUT)?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        debug!(host = %self.config.host, port = self.config.port, "memcache connected");
        Ok(BufReader::new(stream))
    }

    fn full_key(&self, key: &str) -> Result<String> {
        let full = format!("{}{}", self.config.prefix, key);
        if full.is_empty()
            || full.len() > MAX_KEY_LEN
            || full.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control())
        {
            return Err(Error::InvalidArgument(format!(
                "Invalid memcache key: {:?}",
                full
            )));
        }
        Ok(full)
    }

    /// 연결을 잡고 요청 실행. I/O 또는 프로토콜 에러가 나면 연결을 버림
    fn with_conn<T>(&self, f: impl FnOnce(&mut BufReader<TcpStream>) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(Error::BackendUnavailable("memcache".to_string()));
        };

        let result = f(conn);
        if matches!(result, Err(Error::Io(_)) | Err(Error::Cache(_))) {
            *guard = None;
        }
        result
    }

    fn read_line(conn: &mut BufReader<TcpStream>) -> Result<String> {
        let mut line = String::new();
        if conn.read_line(&mut line)? == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "memcache connection closed",
            )));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn send(conn: &mut BufReader<TcpStream>, payload: &[u8]) -> Result<()> {
        let stream = conn.get_mut();
        stream.write_all(payload)?;
        stream.flush()?;
        Ok(())
    }

    /// ttl(초)을 memcached exptime으로 변환
    fn exptime(ttl: u64, now_secs: i64) -> u64 {
        if ttl <= MAX_RELATIVE_EXPTIME {
            ttl
        } else {
            u64::try_from(now_secs).unwrap_or(0).saturating_add(ttl)
        }
    }

    fn expect(line: &str, expected: &[&str]) -> Result<()> {
        if expected.contains(&line) {
            Ok(())
        } else {
            Err(Error::Cache(format!("Unexpected memcache reply: {}", line)))
        }
    }
}

impl CacheBackend for MemcacheBackend {
    fn info(&self) -> BackendInfo {
        let available = *self.available.get_or_init(|| match self.connect() {
            Ok(conn) => {
                *self.conn.lock() = Some(conn);
                true
            }
            Err(e) => {
                debug!(error = %e, "memcache unavailable");
                false
            }
        });
        BackendInfo::new(available, RANK_MEMCACHE)
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        let full_key = self.full_key(key)?;

        let raw = self.with_conn(|conn| {
            Self::send(conn, format!("get {}\r\n", full_key).as_bytes())?;

            let header = Self::read_line(conn)?;
            if header == "END" {
                return Ok(None);
            }

            // VALUE <key> <flags> <bytes>
            let len: usize = header
                .strip_prefix("VALUE ")
                .and_then(|rest| rest.split_whitespace().nth(2))
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| Error::Cache(format!("Unexpected memcache reply: {}", header)))?;

            let total = len
                .checked_add(2)
                .filter(|_| len <= MAX_ITEM_SIZE)
                .ok_or_else(|| Error::Cache(format!("memcache value too large: {} bytes", len)))?;
            let mut data = vec![0u8; total];
            conn.read_exact(&mut data)?;
            data.truncate(len);

            Self::expect(&Self::read_line(conn)?, &["END"])?;
            Ok(Some(data))
        })?;

        match raw {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<()> {
        let full_key = self.full_key(key)?;
        let data = serde_json::to_vec(value)?;
        let ttl = ttl.unwrap_or(self.config.default_ttl);

        // exptime 0은 memcached에서 "만료 없음"이므로 저장 대신 제거
        if ttl == 0 {
            self.delete(key)?;
            debug!(key = %full_key, "memcache save with ttl=0, entry removed");
            return Ok(());
        }
        let exptime = Self::exptime(ttl, now_micros() / MICROS_PER_SEC);

        self.with_conn(|conn| {
            let mut payload =
                format!("set {} 0 {} {}\r\n", full_key, exptime, data.len()).into_bytes();
            payload.extend_from_slice(&data);
            payload.extend_from_slice(b"\r\n");
            Self::send(conn, &payload)?;
            Self::expect(&Self::read_line(conn)?, &["STORED"])
        })
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let full_key = self.full_key(key)?;
        self.with_conn(|conn| {
            Self::send(conn, format!("delete {}\r\n", full_key).as_bytes())?;
            let reply = Self::read_line(conn)?;
            Self::expect(&reply, &["DELETED", "NOT_FOUND"])?;
            Ok(reply == "DELETED")
        })
    }

    fn load_many(&self, _pattern: &str) -> Result<Option<HashMap<String, Value>>> {
        Ok(None)
    }

    fn delete_many(&self, pattern: &DeletePattern) -> Result<usize> {
        match pattern {
            DeletePattern::All => self.with_conn(|conn| {
                Self::send(conn, b"flush_all\r\n")?;
                Self::expect(&Self::read_line(conn)?, &["OK"])?;
                Ok(0)
            }),
            // 서버가 만료를 직접 처리
            DeletePattern::Expired => Ok(0),
            DeletePattern::Substring(_) => Err(Error::Cache(
                "memcache does not support pattern deletes".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use std::thread;

    /// 한 연결만 처리하는 가짜 memcached
    fn fake_server(replies: Vec<&'static str>) -> (u16, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut seen = Vec::new();

            for reply in replies {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line.starts_with("set ") {
                    let mut data = String::new();
                    reader.read_line(&mut data).unwrap();
                }
                seen.push(line.trim_end().to_string());
                writer.write_all(reply.as_bytes()).unwrap();
            }
            seen
        });

        (port, handle)
    }

    fn config(port: u16) -> MemcacheConfig {
        MemcacheConfig {
            prefix: "t:".to_string(),
            port,
            ..Default::default()
        }
    }

    #[test]
    fn test_protocol_roundtrip() {
        let (port, server) = fake_server(vec![
            "STORED\r\n",
            "VALUE t:k 0 7\r\n{\"a\":1}\r\nEND\r\n",
            "END\r\n",
            "DELETED\r\n",
        ]);
        let cache = MemcacheBackend::new(&config(port));

        assert!(cache.info().available);
        cache.save("k", &json!({"a": 1}), Some(60)).unwrap();
        assert_eq!(cache.load("k").unwrap(), Some(json!({"a": 1})));
        assert_eq!(cache.load("missing").unwrap(), None);
        assert!(cache.delete("k").unwrap());
        assert_eq!(cache.load_many("k").unwrap(), None);

        let seen = server.join().unwrap();
        assert_eq!(seen[0], "set t:k 0 60 7");
        assert_eq!(seen[1], "get t:k");
        assert_eq!(seen[3], "delete t:k");
    }

    #[test]
    fn test_ttl_maps_to_exptime() {
        let (port, server) = fake_server(vec!["NOT_FOUND\r\n", "STORED\r\n", "STORED\r\n"]);
        let cache = MemcacheBackend::new(&config(port));
        let before = now_micros() / MICROS_PER_SEC;

        cache.save("k", &json!("v"), Some(0)).unwrap();
        cache.save("m", &json!("v"), Some(40 * 86400)).unwrap();
        cache.save("n", &json!("v"), Some(MAX_RELATIVE_EXPTIME)).unwrap();

        let seen = server.join().unwrap();
        assert_eq!(seen[0], "delete t:k");

        let exptime: i64 = seen[1].split(' ').nth(3).unwrap().parse().unwrap();
        assert!(exptime >= before + 40 * 86400);
        assert!(exptime <= now_micros() / MICROS_PER_SEC + 40 * 86400);

        assert_eq!(seen[2], "set t:n 0 2592000 3");
    }

    #[test]
    fn test_oversized_value_header() {
        for header in ["VALUE t:k 0 18446744073709551615\r\n", "VALUE t:k 0 2097152\r\n"] {
            let (port, server) = fake_server(vec![header]);
            let cache = MemcacheBackend::new(&config(port));

            assert!(matches!(cache.load("k"), Err(Error::Cache(_))));
            assert_eq!(server.join().unwrap(), ["get t:k"]);
            // 프로토콜 상태를 알 수 없으므로 연결을 버림
            assert!(cache.conn.lock().is_none());
        }
    }

    #[test]
    fn test_pattern_delete_unsupported() {
        let cache = MemcacheBackend::new(&config(1));
        assert!(matches!(
            cache.delete_many(&DeletePattern::from("blog")),
            Err(Error::Cache(_))
        ));
        assert_eq!(cache.gc().unwrap(), 0);
    }

    #[test]
    fn test_unavailable_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let cache = MemcacheBackend::new(&config(port));
        assert!(!cache.info().available);
        assert_eq!(cache.info().rank, 10);
    }

    #[test]
    fn test_invalid_key() {
        let cache = MemcacheBackend::new(&config(1));
        assert!(matches!(
            cache.full_key("has space"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
