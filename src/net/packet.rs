//! 数据包类型
//!
//! 协议层的 DATA / ACK 包。构造后不可变：信道"损坏"一个包时得到的是一份校验和被扰动的副本。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 包类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    Data,
    Ack,
}

impl PacketKind {
    fn tag(self) -> u8 {
        match self {
            PacketKind::Data => 1,
            PacketKind::Ack => 2,
        }
    }
}

/// 协议数据包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    kind: PacketKind,
    seq: u64,
    checksum: u16,
    payload: Option<String>,
}

impl Packet {
    pub fn data(seq: u64, payload: impl Into<String>) -> Self {
        let payload = Some(payload.into());
        let checksum = checksum(PacketKind::Data, seq, payload.as_deref());
        Self {
            kind: PacketKind::Data,
            seq,
            checksum,
            payload,
        }
    }

    pub fn ack(seq: u64) -> Self {
        Self {
            kind: PacketKind::Ack,
            seq,
            checksum: checksum(PacketKind::Ack, seq, None),
            payload: None,
        }
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn into_payload(self) -> Option<String> {
        self.payload
    }

    /// 校验和与内容不一致即视为损坏。
    pub fn is_corrupt(&self) -> bool {
        self.checksum != checksum(self.kind, self.seq, self.payload.as_deref())
    }

    /// 返回校验和取反后的副本，接收方的校验必然失败。
    pub(crate) fn corrupted(&self) -> Self {
        Self {
            checksum: !self.checksum,
            ..self.clone()
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Packet kind={:?} seq={} checksum={} payload={}>",
            self.kind,
            self.seq,
            self.checksum,
            self.payload.as_deref().unwrap_or("-")
        )
    }
}

/// 16 位反码和校验（Internet checksum），覆盖包类型、序号（大端）与载荷。
pub fn checksum(kind: PacketKind, seq: u64, payload: Option<&str>) -> u16 {
    let mut buf = Vec::with_capacity(9 + payload.map_or(0, str::len));
    buf.push(kind.tag());
    buf.extend_from_slice(&seq.to_be_bytes());
    if let Some(p) = payload {
        buf.extend_from_slice(p.as_bytes());
    }
    internet_checksum(&buf)
}

fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum = sum.wrapping_add(u16::from_be_bytes([chunk[0], chunk[1]]) as u32);
    }
    if let Some(&byte) = chunks.remainder().first() {
        sum = sum.wrapping_add((byte as u32) << 8);
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}
