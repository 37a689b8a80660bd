use std::io;

use comms::{
    Deserialize, Serialize,
    msg::{Command, Msg, Payload},
};
use tokio::io as tokio_io;

struct MyStr<'a>(&'a str);

impl<'a> Serialize<'a> for MyStr<'_> {
    fn serialize(&'a self, _buf: &mut Vec<u8>) -> Option<&'a [u8]> {
        Some(self.0.as_bytes())
    }
}

impl<'a> Deserialize<'a> for MyStr<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        str::from_utf8(buf)
            .map(Self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[test]
fn serialize_deserialize() {
    let s = MyStr("Hello, world!");
    let serialized = s.serialize(&mut Vec::new()).unwrap();
    let deserialized = MyStr::deserialize(serialized).unwrap();
    assert_eq!(deserialized.0, s.0);
}

#[tokio::test]
async fn send_recv() -> io::Result<()> {
    let msg = MyStr("Hello, world!");

    let (one, two) = tokio_io::duplex(128);
    let (rx, tx) = tokio_io::split(one);
    let (_, mut tx) = comms::channel(rx, tx);

    tx.send(&msg).await?;

    let (rx, tx) = tokio_io::split(two);
    let (mut rx, _) = comms::channel(rx, tx);

    let mut buf = Vec::<f32>::new();
    let s: MyStr = rx.recv_into(&mut buf).await?;

    assert_eq!(msg.0, s.0);
    Ok(())
}

#[tokio::test]
async fn pull_then_grad_exchange() -> io::Result<()> {
    let (one, two) = tokio_io::duplex(4096);
    let (rx, tx) = tokio_io::split(one);
    let (mut wk_rx, mut wk_tx) = comms::channel(rx, tx);
    let (rx, tx) = tokio_io::split(two);
    let (mut sv_rx, mut sv_tx) = comms::channel(rx, tx);

    wk_tx.send(&Msg::Control(Command::Pull)).await?;

    let mut sv_buf = Vec::<f32>::new();
    let Msg::Control(Command::Pull) = sv_rx.recv_into(&mut sv_buf).await? else {
        panic!("expected pull");
    };

    let params = [0.5, 1.5, -2.0];
    sv_tx.send(&Msg::Data(Payload::Params(&params))).await?;

    let mut wk_buf = Vec::<f32>::new();
    let Msg::Data(Payload::Params(got)) = wk_rx.recv_into(&mut wk_buf).await? else {
        panic!("expected params");
    };
    assert_eq!(got, params);

    let grad = [0.1, 0.2, 0.3];
    wk_tx.send(&Msg::Data(Payload::Grad(&grad))).await?;

    let Msg::Data(Payload::Grad(got)) = sv_rx.recv_into(&mut sv_buf).await? else {
        panic!("expected grad");
    };
    assert_eq!(got, grad);

    wk_tx.send(&Msg::Err("boom".into())).await?;
    let Msg::Err(detail) = sv_rx.recv_into(&mut sv_buf).await? else {
        panic!("expected err");
    };
    assert_eq!(detail, "boom");

    Ok(())
}
