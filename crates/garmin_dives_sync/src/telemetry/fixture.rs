//! Builder for small FIT files used by the telemetry tests.

pub const MESG_RECORD: u16 = 20;
const MESG_FIELD_DESCRIPTION: u16 = 206;
const MESG_DEVELOPER_DATA_ID: u16 = 207;

pub const UINT8: u8 = 0x02;
pub const UINT16: u8 = 0x84;
pub const UINT32: u8 = 0x86;
const STRING: u8 = 0x07;
const BYTE: u8 = 0x0D;

const DEVELOPER_ID_LOCAL: u8 = 14;
const DESCRIPTION_LOCAL: u8 = 15;
const NAME_WIDTH: usize = 16;

const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800, 0xB401,
    0x5000, 0x9C01, 0x8801, 0x4400,
];

/// FIT's CRC-16.
pub fn crc(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |mut crc, &byte| {
        let tmp = CRC_TABLE[usize::from(crc & 0xF)];
        crc = (crc >> 4) & 0x0FFF;
        crc = crc ^ tmp ^ CRC_TABLE[usize::from(byte & 0xF)];
        let tmp = CRC_TABLE[usize::from(crc & 0xF)];
        crc = (crc >> 4) & 0x0FFF;
        crc ^ tmp ^ CRC_TABLE[usize::from((byte >> 4) & 0xF)]
    })
}

#[derive(Default)]
pub struct FitBuilder {
    data: Vec<u8>,
}

impl FitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn define(
        mut self,
        header: u8,
        global: u16,
        fields: &[(u8, u8, u8)],
        developer: &[(u8, u8, u8)],
    ) -> Self {
        self.data.extend_from_slice(&[header, 0, 0]);
        self.data.extend_from_slice(&global.to_le_bytes());
        self.data.push(fields.len() as u8);
        for &(number, size, base) in fields {
            self.data.extend_from_slice(&[number, size, base]);
        }
        if header & 0x20 != 0 {
            self.data.push(developer.len() as u8);
            for &(number, size, index) in developer {
                self.data.extend_from_slice(&[number, size, index]);
            }
        }
        self
    }

    /// Definition given as `(field number, size, base type)` triples.
    pub fn definition(self, local: u8, global: u16, fields: &[(u8, u8, u8)]) -> Self {
        self.define(0x40 | local, global, fields, &[])
    }

    /// Definition with developer fields given as `(number, size, developer index)`.
    pub fn developer_definition(
        self,
        local: u8,
        global: u16,
        fields: &[(u8, u8, u8)],
        developer: &[(u8, u8, u8)],
    ) -> Self {
        self.define(0x60 | local, global, fields, developer)
    }

    /// Register a developer and describe one of its fields.
    pub fn describe_developer_field(
        self,
        developer_index: u8,
        field_number: u8,
        base_type: u8,
        name: &str,
    ) -> Self {
        let mut application_id = [0u8; 16];
        application_id[0] = developer_index.wrapping_add(1);
        let id_payload = [&application_id[..], &[developer_index]].concat();

        let mut raw_name = [0u8; NAME_WIDTH];
        let len = name.len().min(NAME_WIDTH - 1);
        raw_name[..len].copy_from_slice(&name.as_bytes()[..len]);
        let description = [&[developer_index, field_number, base_type][..], &raw_name].concat();

        self.definition(
            DEVELOPER_ID_LOCAL,
            MESG_DEVELOPER_DATA_ID,
            &[(1, 16, BYTE), (3, 1, UINT8)],
        )
        .data(DEVELOPER_ID_LOCAL, &id_payload)
        .definition(
            DESCRIPTION_LOCAL,
            MESG_FIELD_DESCRIPTION,
            &[
                (0, 1, UINT8),
                (1, 1, UINT8),
                (2, 1, UINT8),
                (3, NAME_WIDTH as u8, STRING),
            ],
        )
        .data(DESCRIPTION_LOCAL, &description)
    }

    pub fn data(mut self, local: u8, payload: &[u8]) -> Self {
        self.data.push(local & 0x0F);
        self.data.extend_from_slice(payload);
        self
    }

    pub fn compressed(mut self, local: u8, time_offset: u8, payload: &[u8]) -> Self {
        self.data
            .push(0x80 | ((local & 0x03) << 5) | (time_offset & 0x1F));
        self.data.extend_from_slice(payload);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let size = self.data.len() as u32;
        self.finish_declaring(size)
    }

    /// Finish with an arbitrary data size in the header; CRCs stay valid.
    pub fn finish_declaring(self, data_size: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.data.len());
        out.push(14);
        out.push(0x20);
        out.extend_from_slice(&2_132u16.to_le_bytes());
        out.extend_from_slice(&data_size.to_le_bytes());
        out.extend_from_slice(b".FIT");
        let header_crc = crc(&out);
        out.extend_from_slice(&header_crc.to_le_bytes());
        out.extend_from_slice(&self.data);
        let file_crc = crc(&out);
        out.extend_from_slice(&file_crc.to_le_bytes());
        out
    }
}

fn record(ts: u32, depth_mm: u32) -> Vec<u8> {
    [&ts.to_le_bytes()[..], &depth_mm.to_le_bytes()].concat()
}

/// A dive whose records carry `depth` and a `tank_pressure` developer
/// field in bar. `None` writes a record without the pressure field.
pub fn tank_pressure_dive(pressures: &[Option<u16>]) -> Vec<u8> {
    let mut builder = FitBuilder::new()
        .describe_developer_field(0, 0, UINT16, "tank_pressure")
        .developer_definition(
            0,
            MESG_RECORD,
            &[(253, 4, UINT32), (92, 4, UINT32)],
            &[(0, 2, 0)],
        )
        .definition(1, MESG_RECORD, &[(253, 4, UINT32), (92, 4, UINT32)]);
    for (i, p) in pressures.iter().enumerate() {
        let base = record(1_000_000_000 + i as u32 * 10, 5_000 + i as u32 * 100);
        builder = match p {
            Some(p) => builder.data(0, &[&base[..], &p.to_le_bytes()].concat()),
            None => builder.data(1, &base),
        };
    }
    builder.finish()
}

/// A dive with depth records only.
pub fn depth_only_dive() -> Vec<u8> {
    FitBuilder::new()
        .definition(0, MESG_RECORD, &[(253, 4, UINT32), (92, 4, UINT32)])
        .data(0, &record(1_000_000_000, 8_000))
        .finish()
}
