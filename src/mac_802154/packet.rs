use ieee802154::mac::*;
use ieee802154::mac::command::Command;

use heapless::Vec;

/// Maximum MAC payload size (aMaxPHYPacketSize - minimum MAC overhead)
pub const MAX_MSDU_LEN: usize = 118;

/// Packet object represents an IEEE 802.15.4 object with owned storage.
///
/// Based on https://docs.rs/ieee802154/0.3.0/ieee802154/mac/frame/struct.Frame.html
/// altered for static / owned storage via heapless
#[derive(Clone, Debug)]
pub struct Packet {
    pub header: Header,

    pub content: FrameContent,

    payload: Vec<u8, 256>,

    pub footer: [u8; 2],
}

impl PartialEq for Packet {
    fn eq(&self, o: &Self) -> bool {
        self.header == o.header &&
        self.content == o.content &&
        self.payload() == o.payload() &&
        self.footer == o.footer
    }
}

fn header(frame_type: FrameType, dest: Address, source: Address, seq: u8, ack_request: bool) -> Header {
    Header {
        frame_type,
        frame_pending: false,
        security: Security::None,
        ack_request,
        pan_id_compress: false,
        version: FrameVersion::Ieee802154_2006,
        destination: dest,
        source,
        seq,
        seq_no_suppress: false,
        ie_present: false,
    }
}

impl Packet {
    /// Build a MAC command frame, commands always request acknowledgement
    pub fn command(dest: Address, source: Address, seq: u8, command: Command) -> Packet {
        Packet {
            header: header(FrameType::MacCommand, dest, source, seq, true),
            content: FrameContent::Command(command),
            payload: Vec::new(),
            footer: [0u8; 2],
        }
    }

    /// Build a data frame, fails if the payload exceeds the packet storage
    pub fn data(dest: Address, source: Address, seq: u8, data: &[u8], ack: bool) -> Result<Packet, ()> {
        let payload = Vec::from_slice(data)?;

        Ok(Packet {
            header: header(FrameType::Data, dest, source, seq, ack),
            content: FrameContent::Data,
            payload,
            footer: [0u8; 2],
        })
    }

    /// Generate an ACK for the provided packet
    pub fn ack(request: &Packet, frame_pending: bool) -> Packet {
        let mut h = header(FrameType::Acknowledgement, request.header.source, request.header.destination, request.header.seq, false);
        h.frame_pending = frame_pending;

        Packet {
            header: h,
            content: FrameContent::Acknowledgement,
            payload: Vec::new(),
            footer: [0u8; 2],
        }
    }

    pub fn pan_id(&self) -> PanId {
        match self.header.destination {
            Address::Short(pan_id, _) => return pan_id,
            Address::Extended(pan_id, _) => return pan_id,
            _ => (),
        }
        match self.header.source {
            Address::Short(pan_id, _) => return pan_id,
            Address::Extended(pan_id, _) => return pan_id,
            _ => (),
        }

        PanId::broadcast()
    }

    /// Check whether this packet is an ack for the provided packet
    pub fn is_ack_for(&self, original: &Packet) -> bool {
        self.header.frame_type == FrameType::Acknowledgement &&
        self.header.source == original.header.destination &&
        self.header.destination == original.header.source &&
        self.header.seq == original.header.seq &&
        self.content == FrameContent::Acknowledgement
    }

    /// Check whether this packet is a Data Request (poll) command
    pub fn is_data_request(&self) -> bool {
        matches!(self.content, FrameContent::Command(Command::DataRequest))
    }

    // Based on https://docs.rs/ieee802154/0.3.0/ieee802154/mac/frame/struct.Frame.html#method.encode
    pub fn encode(&self, buf: &mut [u8], write_footer: WriteFooter) -> usize {
        let mut len = 0;

        len += self.header.encode(&mut buf[len..]);

        len += self.content.encode(&mut buf[len..]);

        buf[len .. len+self.payload.len()].copy_from_slice(&self.payload);
        len += self.payload.len();

        match write_footer {
            WriteFooter::No => (),
        }
        len
    }

    // Based on https://docs.rs/ieee802154/0.3.0/ieee802154/mac/frame/struct.Frame.html#method.decode
    pub fn decode(buf: &[u8], contains_footer: bool) -> Result<Self, DecodeError> {
        let mut remaining = buf.len();

        let (header, header_len) = Header::decode(buf)?;
        remaining -= header_len;

        let mut footer = [0; 2];
        if contains_footer {
            if remaining < 2 {
                return Err(DecodeError::NotEnoughBytes);
            }

            let footer_pos = buf.len() - 2;
            footer.copy_from_slice(&buf[footer_pos..]);

            remaining -= 2;
        }

        let body = &buf[header_len..header_len+remaining];

        let (content, used) = FrameContent::decode(body, &header)?;

        let payload = Vec::from_slice(&body[used..]).map_err(|_e| DecodeError::NotEnoughBytes)?;

        Ok(Packet {
            header,
            content,
            payload,
            footer,
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(any(test, feature = "std"))]
impl From<Packet> for std::vec::Vec<u8> {
    fn from(p: Packet) -> std::vec::Vec<u8> {
        let mut buff = [0u8; 256];
        let n = p.encode(&mut buff, WriteFooter::No);
        buff[..n].to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn data_encode_decode() {
        let p = Packet::data(
            Address::Short(PanId(1), ShortAddress(2)),
            Address::Extended(PanId(1), ExtendedAddress(3)),
            4,
            &[0, 1, 2, 3, 4, 5],
            true,
        ).unwrap();

        let mut buff = [0u8; 256];
        let n = p.encode(&mut buff, WriteFooter::No);

        let d = Packet::decode(&buff[..n], false).unwrap();
        assert_eq!(p, d);
        assert_eq!(d.payload(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(d.pan_id(), PanId(1));
    }

    #[test]
    fn data_too_long() {
        let a = Address::Short(PanId(1), ShortAddress(2));
        assert!(Packet::data(a, a, 0, &[0u8; 300], false).is_err());
    }

    #[test]
    fn ack_matching() {
        let p = Packet::data(
            Address::Short(PanId(1), ShortAddress(2)),
            Address::Short(PanId(1), ShortAddress(3)),
            9,
            &[0xaa],
            true,
        ).unwrap();

        let ack = Packet::ack(&p, false);
        assert!(ack.is_ack_for(&p));
        assert!(!p.is_ack_for(&p));

        let mut other = p.clone();
        other.header.seq = 10;
        assert!(!ack.is_ack_for(&other));
    }

    #[test]
    fn data_request_command() {
        let coord = Address::Short(PanId(1), ShortAddress(1));
        let dev = Address::Extended(PanId(1), ExtendedAddress(0x22));

        let poll = Packet::command(coord, dev, 3, Command::DataRequest);
        assert!(poll.is_data_request());
        assert!(poll.header.ack_request);

        let ack = Packet::ack(&poll, true);
        assert!(ack.header.frame_pending);
        assert!(ack.is_ack_for(&poll));
    }
}
